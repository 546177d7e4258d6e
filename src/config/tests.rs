use super::*;

#[test]
fn defaults_resolve_to_local_listener() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:5000");
    assert_eq!(settings.pagination.default_size, 15);
    assert_eq!(settings.cache.backend, CacheBackend::Memory);
    assert_eq!(settings.cache.ttl, Duration::from_secs(300));
    assert!(settings.cache.enabled);
    assert!(settings.auth.jwt_secret.is_none());
}

#[test]
fn upload_limits_default_to_two_gib_audio_and_two_mib_pictures() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.uploads.audio_max_bytes.get(), 2 * 1024 * 1024 * 1024);
    assert_eq!(settings.uploads.picture_max_bytes.get(), 2 * 1024 * 1024);
    assert!(settings.uploads.max_request_bytes.get() > settings.uploads.audio_max_bytes.get());
    assert!(
        settings
            .uploads
            .audio_content_types
            .iter()
            .any(|value| value == "audio/mpeg")
    );
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cache.backend = Some("memory".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache_backend: Some(CacheBackendArg::Postgres),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.backend, CacheBackend::Postgres);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_secrets_are_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.auth.jwt_secret = Some("   ".to_string());
    raw.database.url = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(settings.auth.jwt_secret.is_none());
    assert!(settings.database.url.is_none());
}

#[test]
fn rejects_unknown_cache_backend() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("redis".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown backend rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.backend",
            ..
        }
    ));
}

#[test]
fn cache_ttl_is_bounded() {
    let mut raw = RawSettings::default();
    raw.cache.ttl_seconds = Some(u64::MAX);

    let err = Settings::from_raw(raw).expect_err("huge ttl rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.ttl_seconds",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.cache.ttl_seconds = Some(30 * 24 * 60 * 60);
    let settings = Settings::from_raw(raw).expect("thirty days accepted");
    assert_eq!(settings.cache.ttl, Duration::from_secs(2_592_000));
}

#[test]
fn rejects_out_of_range_page_size() {
    let mut raw = RawSettings::default();
    raw.pagination.default_size = Some(500);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn rejects_relative_base_url() {
    let mut raw = RawSettings::default();
    raw.storage.base_url = Some("media".to_string());

    let err = Settings::from_raw(raw).expect_err("relative url rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "storage.base_url",
            ..
        }
    ));
}

#[test]
fn content_types_are_normalized() {
    let mut raw = RawSettings::default();
    raw.uploads.audio_content_types = Some(vec![" Audio/MPEG ".to_string(), String::new()]);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.uploads.audio_content_types, vec!["audio/mpeg"]);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["audiochan"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "audiochan",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--cache-backend",
        "postgres",
        "--log-json",
        "true",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(
                serve.overrides.cache_backend,
                Some(CacheBackendArg::Postgres)
            );
            assert_eq!(serve.overrides.log_json, Some(true));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from([
        "audiochan",
        "migrate",
        "--database-url",
        "postgres://example",
    ]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => {
            assert_eq!(
                migrate.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
