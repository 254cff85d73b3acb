use chrono::Duration;
use paydesk_api::auth::JwtKeys;
use paydesk_core::Config;

pub const TEST_USER_ID: &str = "user_1";
pub const OTHER_USER_ID: &str = "user_2";

/// `Authorization` header value for `user_id`, signed with the test secret.
pub fn bearer(user_id: &str) -> String {
    let keys = JwtKeys::new(&Config::for_tests().base.jwt_secret);
    let token = keys
        .sign(user_id, Duration::hours(1))
        .expect("Failed to sign test token");
    format!("Bearer {}", token)
}

/// OAuth `state` the authorize endpoint would hand out for `user_id`.
pub fn connect_state(user_id: &str) -> String {
    JwtKeys::new(&Config::for_tests().base.jwt_secret)
        .sign_connect_state(user_id, Duration::minutes(15))
        .expect("Failed to sign connect state")
}

pub fn keys() -> JwtKeys {
    JwtKeys::new(&Config::for_tests().base.jwt_secret)
}
