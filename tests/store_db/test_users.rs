//! Users created from README identities.

use jobdiary_lib::store::JobStore;

use super::test_helpers::{create_test_pool, unique_username};

#[tokio::test]
async fn test_new_user_gets_names_from_email() {
    let pool = create_test_pool().await;
    let username = unique_username("usera");

    let user = pool
        .get_or_create_user(&username, "jane.doe@example.com")
        .await
        .unwrap();

    assert_eq!(user.username, username);
    assert_eq!(user.email, "jane.doe@example.com");
    assert_eq!(user.first_name, "jane");
    assert_eq!(user.last_name, "doe");
}

#[tokio::test]
async fn test_existing_username_is_reused_with_other_email() {
    let pool = create_test_pool().await;
    let username = unique_username("userb");

    let first = pool
        .get_or_create_user(&username, "john.smith@example.com")
        .await
        .unwrap();
    let second = pool
        .get_or_create_user(&username, "someone.else@example.com")
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.email, "john.smith@example.com");
}
