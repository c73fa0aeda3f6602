use std::sync::Arc;

use eventflix_core::session::ORGANIZER_ROLE;
use eventflix_core::store::keys;
use eventflix_core::{AppContext, ApplyMode, Config, FileStore, KeyValueStore, Language};
use tempfile::TempDir;

fn open_context(dir: &TempDir, platform: Option<&str>) -> AppContext {
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open_in(dir.path()).unwrap());
    AppContext::with_store(Config::default(), Some(store), platform.map(str::to_string)).unwrap()
}

#[tokio::test]
async fn test_login_then_clear_keeps_language() {
    let dir = TempDir::new().unwrap();
    let ctx = open_context(&dir, None);
    ctx.locale.set_locale("ca", ApplyMode::InPlace);

    ctx.session.save_token("tok1");
    ctx.session.save_user_role(ORGANIZER_ROLE);
    assert!(ctx.session.is_logged_in());
    assert_eq!(ctx.session.get_user_role().as_deref(), Some(ORGANIZER_ROLE));

    let before = ctx.locale.get_locale();
    ctx.session.clear_session();

    assert!(!ctx.session.is_logged_in());
    assert_eq!(ctx.session.get_user_role(), None);
    assert_eq!(ctx.locale.get_locale(), before);

    ctx.session.flush().await;
    assert_eq!(ctx.locale.get_locale(), Language::Ca);
}

#[tokio::test]
async fn test_invalid_language_after_valid_one_is_spanish() {
    let dir = TempDir::new().unwrap();
    let ctx = open_context(&dir, Some("en_GB.UTF-8"));

    ctx.locale.set_locale("en", ApplyMode::InPlace);
    ctx.locale.set_locale("xx-invalid", ApplyMode::InPlace);
    assert_eq!(ctx.locale.get_locale(), Language::Es);
}

#[tokio::test]
async fn test_clear_preserves_every_language() {
    let dir = TempDir::new().unwrap();
    let ctx = open_context(&dir, None);

    for language in Language::ALL {
        ctx.locale.set_locale(language.code(), ApplyMode::Reload);
        ctx.session.save_token("tok");
        ctx.session.clear_session_sync().await;
        assert_eq!(ctx.locale.get_locale(), language);
    }
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let ctx = open_context(&dir, None);
        ctx.session.save_token("tok1");
        ctx.session.save_user_role("usuario");
        ctx.locale.set_locale("en", ApplyMode::InPlace);
        ctx.shutdown().await;
    }

    let ctx = open_context(&dir, None);
    assert!(ctx.session.is_logged_in());
    assert_eq!(ctx.session.get_token().as_deref(), Some("tok1"));
    assert!(!ctx.session.is_organizer());
    assert_eq!(ctx.locale.get_locale(), Language::En);
}

#[tokio::test]
async fn test_committed_clear_is_durable() {
    let dir = TempDir::new().unwrap();
    {
        let ctx = open_context(&dir, None);
        ctx.locale.set_locale("ca", ApplyMode::InPlace);
        ctx.session.save_token("tok1");
        ctx.session.save_user_role(ORGANIZER_ROLE);
        ctx.session.clear_session_sync().await;

        // Durable before the context goes away
        let on_disk = FileStore::open_in(dir.path()).unwrap();
        assert_eq!(on_disk.get(keys::AUTH_TOKEN).unwrap(), None);
        assert_eq!(on_disk.get(keys::USER_ROLE).unwrap(), None);
        assert_eq!(on_disk.get(keys::SELECTED_LANGUAGE).unwrap().as_deref(), Some("ca"));
    }

    let ctx = open_context(&dir, None);
    assert!(!ctx.session.is_logged_in());
    assert_eq!(ctx.locale.get_locale(), Language::Ca);
}

#[tokio::test]
async fn test_blank_token_never_replaces_session() {
    let dir = TempDir::new().unwrap();
    let ctx = open_context(&dir, None);

    ctx.session.save_token("");
    assert!(!ctx.session.is_logged_in());

    ctx.session.save_token("abc123");
    ctx.session.save_token("  ");
    assert_eq!(ctx.session.get_token().as_deref(), Some("abc123"));
    assert!(ctx.session.has_valid_token());
}

#[tokio::test]
async fn test_without_store_everything_degrades() {
    let ctx = AppContext::with_store(Config::default(), None, Some("ca".to_string())).unwrap();

    assert!(!ctx.session.is_initialized());
    ctx.session.save_token("tok1");
    assert!(!ctx.session.is_logged_in());
    ctx.session.clear_session_sync().await;

    assert_eq!(ctx.locale.get_locale(), Language::Ca);
    ctx.locale.set_locale("en", ApplyMode::InPlace);
    assert_eq!(ctx.locale.get_locale(), Language::En);
}

#[tokio::test]
async fn test_observers_see_language_changes() {
    let dir = TempDir::new().unwrap();
    let ctx = open_context(&dir, None);
    let mut screen_a = ctx.locale.subscribe();
    let screen_b = ctx.locale.subscribe();

    ctx.locale.set_locale("en", ApplyMode::Reload);
    ctx.session.clear_session_sync().await;

    screen_a.changed().await.unwrap();
    let seen = screen_a.borrow_and_update().clone();
    assert_eq!(seen.language, Language::En);
    assert_eq!(seen.apply, ApplyMode::Reload);
    assert_eq!(screen_b.borrow().version, seen.version);
}

#[tokio::test]
async fn test_corrupt_preferences_do_not_disable_persistence() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("preferences.json"), "{").unwrap();
    let config = Config {
        data_dir: Some(dir.path().to_path_buf()),
        ..Config::default()
    };

    let ctx = AppContext::start(config.clone()).unwrap();
    assert!(ctx.session.is_initialized());
    ctx.session.save_token("tok1");
    ctx.locale.set_locale("en", ApplyMode::InPlace);
    ctx.shutdown().await;

    let again = AppContext::start(config).unwrap();
    assert!(again.session.is_initialized());
    assert!(again.session.is_logged_in());
    assert_eq!(again.locale.get_locale(), Language::En);
}
