use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Duration, Utc};

use taskmate::config::SearchConfig;
use taskmate::friend::{self, FriendshipStatus, RelationStatus};
use taskmate::notification::{self, NotificationType};
use taskmate::priority::Priority;
use taskmate::session::Session;
use taskmate::store::Store;
use taskmate::task::{self, NewTask, TaskView};
use taskmate::user::{self, NewUser};
use taskmate::{bump, search, Error};

fn register(store: &Store, username: &str, first: &str, last: &str) -> Session {
    let record = user::register(
        store,
        &NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: first.to_string(),
            last_name: last.to_string(),
        },
    )
    .expect("register");
    Session::for_user(&record)
}

fn befriend(store: &Store, from: &Session, to: &Session) -> i64 {
    let request = friend::send_request(store, from, &to.username).expect("request");
    friend::accept_request(store, to, request.friendship.id).expect("accept");
    request.friendship.id
}

#[test]
fn friendship_round_trip_between_two_users() {
    let store = Store::open_in_memory().expect("store");
    let ann = register(&store, "ann", "Ann", "Lee");
    let bob = register(&store, "bob", "Bob", "Stone");

    let id = befriend(&store, &ann, &bob);

    assert!(friend::sent_requests(&store, &ann).expect("sent").is_empty());
    let ann_friends = friend::list_friends(&store, &ann).expect("friends");
    assert_eq!(ann_friends[0].user.username, "bob");
    assert_eq!(ann_friends[0].friendship_id, id);

    let ann_view = friend::relation_with(&store, &ann, "bob").expect("relation");
    assert_eq!(ann_view.status, RelationStatus::Friends);
    assert_eq!(ann_view.friendship_id, Some(id));
    assert_eq!(
        friend::list_friends(&store, &bob).expect("friends")[0].user.username,
        "ann"
    );

    let kinds: Vec<NotificationType> = notification::list(&store, &ann, false, 10)
        .expect("list")
        .into_iter()
        .map(|record| record.kind)
        .collect();
    assert_eq!(kinds, vec![NotificationType::FriendAccepted]);

    friend::remove_friend(&store, &bob, id).expect("remove");
    let after = friend::relation_with(&store, &ann, "bob").expect("relation");
    assert_eq!(after.status, RelationStatus::None);
    assert_eq!(after.friendship_id, None);
}

#[test]
fn rejected_request_is_replaced_by_a_new_one() {
    let store = Store::open_in_memory().expect("store");
    let ann = register(&store, "ann", "Ann", "Lee");
    let bob = register(&store, "bob", "Bob", "Stone");

    let first = friend::send_request(&store, &ann, "bob").expect("request");
    let rejected = friend::reject_request(&store, &bob, first.friendship.id).expect("reject");
    assert_eq!(rejected.status, FriendshipStatus::Rejected);

    // Either side may ask again after a rejection.
    let second = friend::send_request(&store, &bob, "ann").expect("re-request");
    assert_eq!(second.friendship.status, FriendshipStatus::Pending);
    assert_ne!(second.friendship.id, first.friendship.id);
    assert_eq!(friend::incoming_requests(&store, &ann).expect("incoming").len(), 1);
    assert!(friend::sent_requests(&store, &ann).expect("sent").is_empty());

    let err = friend::send_request(&store, &ann, "bob").expect_err("pending");
    assert!(matches!(err, Error::AlreadyExists(_)));
}

#[test]
fn simultaneous_requests_from_two_processes_leave_one_pending_row() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("taskmate.db");
    let (ann, bob) = {
        let store = Store::open(&path).expect("store");
        (
            register(&store, "ann", "Ann", "Lee"),
            register(&store, "bob", "Bob", "Stone"),
        )
    };

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [(ann.clone(), "bob"), (bob.clone(), "ann")]
        .into_iter()
        .map(|(session, target)| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let store = Store::open(&path).expect("store");
                barrier.wait();
                friend::send_request(&store, &session, target).map(|request| request.friendship.id)
            })
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread"))
        .collect();

    let sent: Vec<i64> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
    assert_eq!(sent.len(), 1, "{results:?}");
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(Error::AlreadyExists(_)))));

    let store = Store::open(&path).expect("store");
    let pending = friend::incoming_requests(&store, &ann).expect("incoming").len()
        + friend::incoming_requests(&store, &bob).expect("incoming").len();
    assert_eq!(pending, 1);
}

#[test]
fn failed_bump_leaves_no_notification() {
    let store = Store::open_in_memory().expect("store");
    let ann = register(&store, "ann", "Ann", "Lee");
    let bob = register(&store, "bob", "Bob", "Stone");
    let task = task::create_task(
        &store,
        &ann,
        NewTask {
            title: "Ship it".to_string(),
            is_public: true,
            ..NewTask::default()
        },
    )
    .expect("task");

    let err = bump::send_bump(&store, &bob, task.id, None).expect_err("not friends");
    assert!(matches!(err, Error::NotFriends));
    assert_eq!(notification::unread_count(&store, &ann).expect("count"), 0);

    befriend(&store, &ann, &bob);
    let receipt = bump::send_bump(&store, &bob, task.id, Some("   ")).expect("bump");
    assert_eq!(receipt.recipient_id, ann.user_id);
    assert_eq!(receipt.message, "Bob bumped your task \"Ship it\"");
    // friend_accepted plus the bump.
    assert_eq!(notification::unread_count(&store, &ann).expect("count"), 2);
}

#[test]
fn effective_priority_rises_toward_the_deadline() {
    let store = Store::open_in_memory().expect("store");
    let ann = register(&store, "ann", "Ann", "Lee");
    let due = (Utc::now() + Duration::days(10)).date_naive();
    let record = task::create_task(
        &store,
        &ann,
        NewTask {
            title: "Taxes".to_string(),
            priority: Some(Priority::Low),
            due_date: Some(due),
            ..NewTask::default()
        },
    )
    .expect("task");

    let fresh = TaskView::new(record.clone(), record.created_at);
    assert_eq!(fresh.effective_priority, Priority::Low);

    let span = taskmate::urgency::due_instant(due) - record.created_at;
    let past_half = TaskView::new(record.clone(), record.created_at + span * 6 / 10);
    assert_eq!(past_half.effective_priority, Priority::Medium);

    let near = TaskView::new(record.clone(), record.created_at + span * 95 / 100);
    assert_eq!(near.effective_priority, Priority::High);
    assert_eq!(near.effective_level, 3);

    let late = TaskView::new(record.clone(), record.created_at + span * 2);
    assert_eq!(late.effective_priority, Priority::Low);
    assert!(late.overdue);
}

#[test]
fn search_ranks_across_the_store() {
    let store = Store::open_in_memory().expect("store");
    let me = register(&store, "zed", "Zed", "Zulu");
    register(&store, "sam", "Sam", "Smith");
    register(&store, "samantha", "Samantha", "Jones");
    register(&store, "alex", "Alex", "Samson");
    register(&store, "bob", "Bob", "Stone");

    let hits = search::search_users(&store, &me, "sam", &SearchConfig::default()).expect("search");
    let names: Vec<&str> = hits.iter().map(|hit| hit.user.username.as_str()).collect();
    assert_eq!(names, vec!["sam", "samantha", "alex"]);
    assert!(search::search_users(&store, &me, "zed", &SearchConfig::default())
        .expect("search")
        .is_empty());
}
