use app_config::AppConfig;
use std::time::Duration;

#[test]
fn test_load_default_config() {
    let cfg = AppConfig::load().unwrap();
    assert_eq!(cfg.db_port, 5432);
    assert_eq!(cfg.http_port, 3020);
    assert_eq!(cfg.currency, "INR");
    assert_eq!(cfg.search_radius_m, 5000.0);
    assert_eq!(cfg.shutdown_timeout, Duration::from_secs(5));
    assert_eq!(cfg.suggestion_cache_ttl, Duration::from_secs(600));
}
