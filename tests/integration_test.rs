use assert_cmd::Command;
use assert_cmd::cargo;
use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::Server;
use predicates::prelude::*;
use reqwest::Url;
use std::fs;
use std::io::prelude::*;
use std::path::{Path, PathBuf};
use tar::Builder;
use tempfile::{TempDir, tempdir};

fn create_tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let mut tar_builder = Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_path(name).unwrap();
        header.set_mode(0o755);
        header.set_cksum();
        tar_builder.append(&header, content.as_bytes()).unwrap();
    }
    let tar = tar_builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

/// A scratch area with its own store and link directory.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempdir().unwrap(),
        }
    }

    fn store(&self) -> PathBuf {
        self.dir.path().join("packages")
    }

    fn links(&self) -> PathBuf {
        self.dir.path().join("active")
    }

    fn pvp(&self) -> Command {
        let mut cmd = Command::new(cargo::cargo_bin!("pvp"));
        cmd.arg("--store")
            .arg(self.store())
            .arg("--links")
            .arg(self.links())
            .env_remove("PVP_STORE")
            .env_remove("PVP_LINK_DIR");
        cmd
    }

    /// Write `foo-<version>.tar.gz` next to the store and return its file:// URL.
    fn local_tarball(&self, name: &str, version: &str) -> String {
        let top = format!("{}-{}", name, version);
        let bin = format!("{}/bin/{}", top, name);
        let readme = format!("{}/README", top);
        let path = self.dir.path().join(format!("{}.tar.gz", top));
        fs::write(
            &path,
            create_tar_gz(&[(bin.as_str(), "#!/bin/sh\necho hi\n"), (readme.as_str(), version)]),
        )
        .unwrap();
        Url::from_file_path(&path).unwrap().to_string()
    }

    fn package_config(&self, name: &str, version: &str, raw_link: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{}.toml", name));
        fs::write(
            &path,
            format!(
                "Name = \"{}\"\nVersion = \"{}\"\nMaintainer = \"Jane Doe\"\n\
                 Description = \"{} utilities\"\nRawLink = \"{}\"\nSection = \"utils\"\n",
                name, version, name, raw_link
            ),
        )
        .unwrap();
        path
    }
}

fn assert_active(links: &Path, name: &str) {
    let link = links.join(name);
    assert!(
        link.symlink_metadata().is_ok(),
        "expected activation link {:?}",
        link
    );
}

#[test]
fn test_publish_install_search_uninstall() {
    let ws = Workspace::new();
    let url = ws.local_tarball("foo", "1.0");
    let config = ws.package_config("foo", "1.0", &url);

    ws.pvp()
        .arg("publish")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Published foo 1.0"));
    assert!(ws.store().join("foo-1.0.tar.gz").is_file());
    assert!(ws.store().join("foo-1.0.pv").is_file());
    assert_active(&ws.links(), "foo");

    ws.pvp()
        .args(["install", "foo-1.0.pv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed foo 1.0"));
    assert_eq!(
        fs::read_to_string(ws.store().join("foo-1.0/README")).unwrap(),
        "1.0"
    );

    ws.pvp()
        .args(["search", "FO"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 package(s) matching 'FO':"))
        .stdout(predicate::str::contains("Name: foo"))
        .stdout(predicate::str::contains("Maintainer: Jane Doe"))
        .stdout(predicate::str::contains(format!("Raw Link: {}", url)))
        .stdout(predicate::str::contains("Section: utils"));

    ws.pvp()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("foo 1.0 (installed)"));

    ws.pvp()
        .args(["uninstall", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalled foo"));
    assert!(!ws.store().join("foo-1.0").exists());
    assert!(ws.store().join("foo-1.0.pv").is_file());

    ws.pvp()
        .args(["search", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages found for 'foo'."));
}

#[test]
fn test_publish_over_http() {
    let mut server = Server::new();
    let tarball = create_tar_gz(&[("bar-2.0/bin/bar", "bar")]);
    let mock = server
        .mock("GET", "/dist/bar-2.0.tar.gz")
        .with_status(200)
        .with_body(tarball)
        .expect(1)
        .create();

    let ws = Workspace::new();
    let url = format!("{}/dist/bar-2.0.tar.gz", server.url());
    let config = ws.package_config("bar", "2.0", &url);

    ws.pvp().arg("publish").arg(&config).assert().success();
    // The archive is already in the store the second time.
    ws.pvp()
        .arg("publish")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("not downloaded again"));
    mock.assert();

    ws.pvp()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("bar 2.0 (published)"));
}

#[test]
fn test_publish_http_not_found_fails() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/dist/missing.tar.gz")
        .with_status(404)
        .create();

    let ws = Workspace::new();
    let url = format!("{}/dist/missing.tar.gz", server.url());
    let config = ws.package_config("missing", "1.0", &url);

    ws.pvp()
        .arg("publish")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to fetch"));
    assert!(!ws.store().join("missing-1.0.pv").exists());
}

#[test]
fn test_publish_missing_config_fails() {
    let ws = Workspace::new();

    ws.pvp()
        .arg("publish")
        .arg(ws.dir.path().join("nope.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_uninstall_unknown_package_succeeds() {
    let ws = Workspace::new();

    ws.pvp()
        .args(["uninstall", "ghost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Package ghost is not installed."));
}

#[test]
fn test_install_unknown_record_fails() {
    let ws = Workspace::new();

    ws.pvp()
        .args(["install", "ghost-1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_upgrade_reports_incomplete_upgrade() {
    let ws = Workspace::new();
    let url = ws.local_tarball("foo", "1.0");
    let config = ws.package_config("foo", "1.0", &url);

    ws.pvp().arg("publish").arg(&config).assert().success();
    ws.pvp().args(["install", "foo-1.0"]).assert().success();
    fs::remove_file(ws.store().join("foo-1.0.tar.gz")).unwrap();

    ws.pvp()
        .args(["upgrade", "foo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no longer installed"));
    assert!(!ws.store().join("foo-1.0").exists());
}

#[test]
fn test_unknown_command_fails() {
    let ws = Workspace::new();

    ws.pvp().arg("frobnicate").assert().failure();
}

#[test]
fn test_publish_from_xml_config() {
    let ws = Workspace::new();
    let url = ws.local_tarball("baz", "0.3");
    let config = ws.dir.path().join("baz.xml");
    fs::write(
        &config,
        format!(
            "<?xml version=\"1.0\"?>\n<Package>\n  <Name>baz</Name>\n  <Version>0.3</Version>\n  \
             <Maintainer>Jane Doe</Maintainer>\n  <Description>baz tools</Description>\n  \
             <RawLink>{}</RawLink>\n  <Section>devel</Section>\n</Package>\n",
            url
        ),
    )
    .unwrap();

    ws.pvp()
        .arg("publish")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Published baz 0.3"));

    ws.pvp()
        .args(["search", "baz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Section: devel"));
}
