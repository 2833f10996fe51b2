//! tm bump command implementation.

use crate::bump;
use crate::cli::{AppContext, Globals};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

pub fn run(globals: &Globals, task_id: i64, note: Option<&str>) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let receipt = bump::send_bump(&ctx.store, &session, task_id, note)?;

    let mut human = HumanOutput::new("Bump sent");
    human.push_summary("Task", receipt.task_id.to_string());
    human.push_summary("Message", receipt.message.clone());

    emit_success(globals.output(), "bump", &receipt, Some(&human))
}
