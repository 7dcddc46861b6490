//! End-to-end scan and resolution over the on-disk state layout

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use tlskeeper::acme::{AcmeError, FsPartitionStore, PartitionStore, CERT_FILE, CONFIG_FILE};
use tlskeeper::{AppName, Keeper, ManagedReason};

/// notAfter of the generated certificates: 2030-01-01T00:00:00Z
const EXPIRY: i64 = 1_893_456_000;

fn certificate(domain: &str) -> String {
    let mut params = rcgen::CertificateParams::new(vec![domain.to_string()]).unwrap();
    params.not_after = rcgen::date_time_ymd(2030, 1, 1);
    let key_pair = rcgen::KeyPair::generate().unwrap();
    params.self_signed(&key_pair).unwrap().pem()
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn app_dir(root: &Path, app: &str) -> std::path::PathBuf {
    root.join("apps").join(app)
}

fn install(root: &Path, app: &str, pem: &str) {
    let tls = app_dir(root, app).join("tls");
    write(&tls.join("server.crt"), pem);
    write(&tls.join("server.key"), "not a real key");
}

/// Resolve the app's partition, activate it and drop `pem` in as the issued certificate
fn issue(keeper: &Keeper, app: &str, pem: &str) {
    let resolved = keeper
        .resolver()
        .resolve_and_activate(&AppName::new(app))
        .unwrap();
    write(&resolved.partition.path().join(CERT_FILE), pem);
}

fn at(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap()
}

fn fleet() -> (TempDir, Keeper) {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(&root.join("settings.kdl"), "email \"ops@example.com\"\n");

    // Managed: installed certificate is the issued one
    let shop = certificate("shop.example.com");
    write(
        &app_dir(root, "shop").join("settings.kdl"),
        "domains \"shop.example.com\" \"www.shop.example.com\"\n",
    );
    install(root, "shop", &shop);

    // No TLS at all
    write(&app_dir(root, "blog").join("settings.kdl"), "domains \"blog.example.com\"\n");

    // Installed by hand; the issuer produced something else
    let legacy = certificate("legacy.example.com");
    write(
        &app_dir(root, "legacy").join("settings.kdl"),
        "domains \"legacy.example.com\"\ngrace-period 86400\n",
    );
    install(root, "legacy", &legacy);

    let keeper = Keeper::open(root);
    issue(&keeper, "shop", &shop);
    issue(&keeper, "legacy", &certificate("legacy.example.com"));

    (dir, keeper)
}

#[test]
fn scan_reports_only_managed_apps() {
    let (_dir, keeper) = fleet();
    let now = at(EXPIRY - 86_400 * 10);

    let rows: Vec<_> = keeper.scanner().scan_at(now).unwrap().collect();
    assert_eq!(rows.len(), 1);

    let shop = &rows[0];
    assert_eq!(shop.app.as_str(), "shop");
    assert_eq!(shop.expiry.timestamp(), EXPIRY);
    assert_eq!(shop.grace_period.seconds(), 86_400 * 30);
    assert_eq!(shop.time_to_expiry.seconds(), 864_000);
    assert_eq!(shop.time_to_renewal.seconds(), -1_728_000);
    assert!(shop.renewal_due());
}

#[test]
fn identity_reasons_follow_the_files() {
    let (_dir, keeper) = fleet();
    let matcher = keeper.matcher();

    assert_eq!(matcher.check(&AppName::new("shop")), ManagedReason::Managed);
    assert_eq!(matcher.check(&AppName::new("blog")), ManagedReason::TlsDisabled);
    assert_eq!(matcher.check(&AppName::new("legacy")), ManagedReason::Foreign);
    assert_eq!(matcher.check(&AppName::new("ghost")), ManagedReason::TlsDisabled);
}

#[test]
fn replacing_the_installed_certificate_unmanages_the_app() {
    let (dir, keeper) = fleet();
    install(dir.path(), "shop", &certificate("shop.example.com"));

    assert_eq!(
        keeper.matcher().check(&AppName::new("shop")),
        ManagedReason::Foreign
    );
    assert_eq!(keeper.scanner().scan_at(at(0)).unwrap().count(), 0);
}

#[test]
fn corrupt_certificate_is_skipped() {
    let (dir, keeper) = fleet();
    write(
        &app_dir(dir.path(), "broken").join("settings.kdl"),
        "domains \"broken.example.com\"\n",
    );
    install(dir.path(), "broken", "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n");
    issue(
        &keeper,
        "broken",
        "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n",
    );

    assert_eq!(
        keeper.matcher().check(&AppName::new("broken")),
        ManagedReason::Managed
    );
    let names: Vec<_> = keeper
        .scanner()
        .scan_at(at(0))
        .unwrap()
        .map(|row| row.app.into_string())
        .collect();
    assert_eq!(names, ["shop"]);
}

#[test]
fn resolve_is_idempotent_on_disk() {
    let (dir, keeper) = fleet();
    let shop = AppName::new("shop");

    let first = keeper.resolver().resolve(&shop).unwrap();
    let config_path = first.partition.path().join(CONFIG_FILE);
    let text = fs::read_to_string(&config_path).unwrap();
    let second = keeper.resolver().resolve(&shop).unwrap();

    assert_eq!(first.key(), second.key());
    assert_eq!(fs::read_to_string(&config_path).unwrap(), text);
    assert!(text.contains("-d shop.example.com -d www.shop.example.com"));

    let store = FsPartitionStore::new(dir.path());
    assert_eq!(store.list(&shop).unwrap(), vec![first.key().clone()]);
    assert_eq!(store.active(&shop).unwrap().as_ref(), Some(first.key()));
}

#[test]
fn reordered_domains_get_a_new_partition() {
    let (dir, keeper) = fleet();
    let shop = AppName::new("shop");
    let before = keeper.resolver().resolve(&shop).unwrap();

    write(
        &app_dir(dir.path(), "shop").join("settings.kdl"),
        "domains \"www.shop.example.com\" \"shop.example.com\"\n",
    );
    let after = keeper.resolver().resolve(&shop).unwrap();

    assert_ne!(before.key(), after.key());
    let store = FsPartitionStore::new(dir.path());
    assert_eq!(store.list(&shop).unwrap().len(), 2);
}

#[test]
fn missing_email_blocks_resolution_without_side_effects() {
    let dir = TempDir::new().unwrap();
    write(
        &app_dir(dir.path(), "api").join("settings.kdl"),
        "domains \"api.example.com\"\n",
    );
    let keeper = Keeper::open(dir.path());
    let api = AppName::new("api");

    let err = keeper.resolver().resolve(&api).unwrap_err();
    assert!(matches!(err, AcmeError::MissingContactEmail { .. }));
    assert!(err.to_string().contains("email"));
    assert!(keeper.resolver().check_email(&api).is_err());
    assert!(!app_dir(dir.path(), "api").join("acme").exists());
}

#[test]
fn unknown_or_path_like_apps_never_create_directories() {
    let (dir, keeper) = fleet();

    for name in ["shpo", "../outside", ".hidden"] {
        let err = keeper.resolver().resolve(&AppName::new(name)).unwrap_err();
        assert!(matches!(err, AcmeError::UnknownApplication { .. }), "{name}: {err}");
    }

    assert!(!app_dir(dir.path(), "shpo").exists());
    assert!(!dir.path().join("outside").exists());
    assert!(!app_dir(dir.path(), ".hidden").exists());

    let apps: Vec<_> = fs::read_dir(dir.path().join("apps"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(apps.len(), 3);
}

#[test]
fn domain_with_embedded_flag_is_rejected() {
    let (dir, keeper) = fleet();
    let shop = AppName::new("shop");
    let before = FsPartitionStore::new(dir.path()).list(&shop).unwrap();

    write(
        &app_dir(dir.path(), "shop").join("settings.kdl"),
        "domains \"shop.example.com -d www.shop.example.com\"\n",
    );

    let err = keeper.resolver().resolve(&shop).unwrap_err();
    assert!(matches!(err, AcmeError::InvalidSetting { ref key, .. } if key == "domains"));
    assert_eq!(FsPartitionStore::new(dir.path()).list(&shop).unwrap(), before);
}

#[test]
fn app_scope_overrides_global_settings() {
    let (dir, keeper) = fleet();
    write(
        &app_dir(dir.path(), "shop").join("settings.kdl"),
        "domains \"shop.example.com\"\nemail \"shop@example.com\"\nserver \"staging\"\ngrace-period 3600\n",
    );
    let shop = AppName::new("shop");

    let resolved = keeper.resolver().resolve(&shop).unwrap();
    assert_eq!(resolved.config.email, "shop@example.com");
    assert_eq!(
        resolved.config.server.directory_url(),
        "https://acme-staging-v02.api.letsencrypt.org/directory"
    );

    // The previously issued certificate is still the active one
    let rows: Vec<_> = keeper.scanner().scan_at(at(EXPIRY - 7_200)).unwrap().collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].grace_period.seconds(), 3_600);
    assert!(!rows[0].renewal_due());
}

#[test]
fn unreadable_settings_surface_as_configuration_errors() {
    let (dir, keeper) = fleet();
    write(&app_dir(dir.path(), "shop").join("settings.kdl"), "email {\n");

    let err = keeper.resolver().resolve(&AppName::new("shop")).unwrap_err();
    assert!(matches!(err, AcmeError::ConfigurationUnreadable(_)));
}
