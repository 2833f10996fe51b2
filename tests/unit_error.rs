use taskmate::error::{exit_codes, Error, JsonError};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::InvalidArgument("bad".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);
    assert_eq!(Error::NoSession.exit_code(), exit_codes::USER_ERROR);
    assert_eq!(Error::SelfBump.exit_code(), exit_codes::USER_ERROR);

    assert_eq!(Error::NotFriends.exit_code(), exit_codes::POLICY_BLOCKED);
    assert_eq!(Error::PrivateTask.exit_code(), exit_codes::POLICY_BLOCKED);
    let conflict = Error::AlreadyExists("pending".to_string());
    assert_eq!(conflict.exit_code(), exit_codes::POLICY_BLOCKED);

    let op = Error::OperationFailed("boom".to_string());
    assert_eq!(op.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn kinds_group_errors_for_callers() {
    assert_eq!(Error::SelfBump.kind(), "validation");
    assert_eq!(Error::not_found("task", 7).kind(), "not_found");
    assert_eq!(Error::NotFriends.kind(), "unauthorized");
    assert_eq!(Error::Conflict("email".to_string()).kind(), "conflict");
    assert_eq!(Error::OperationFailed("disk".to_string()).kind(), "server");
}

#[test]
fn json_error_includes_code() {
    let err = Error::not_found("project", 12);
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    assert_eq!(json.kind, "not_found");
    assert!(json.error.contains("project not found: 12"));
    let details = json.details.expect("details");
    assert_eq!(details["entity"], "project");
    assert_eq!(details["id"], "12");
}
