#[test]
fn shutdown_flag_can_toggle() {
    assert!(!aprassist_service::shutdown_requested());
    aprassist_service::request_shutdown("localhost:0");
    assert!(aprassist_service::shutdown_requested());
    aprassist_service::clear_shutdown_flag();
    assert!(!aprassist_service::shutdown_requested());
}

#[test]
fn default_service_addr_is_local() {
    assert_eq!(aprassist_service::DEFAULT_ADDR, "localhost:3001");
    assert!(aprassist_service::resolve_service_addr().contains(':'));
}
