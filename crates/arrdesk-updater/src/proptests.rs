//! Property-based tests for arrdesk-updater.
//!
//! # Properties Tested
//!
//! - Property 1: Artifact hash verification accepts exactly the right bytes
//! - Property 2: Version comparison follows semver and ignores a leading `v`
//! - Property 3: Asset selection never picks a checksum or foreign-OS file

use proptest::prelude::*;
use semver::Version;
use sha2::{Digest, Sha256};
use std::io::Write;
use tempfile::NamedTempFile;

use crate::artifact::{compute_hash, ArtifactVerifier};
use crate::release::{parse_version, select_asset, FeedAsset, FeedRelease, Platform, Release};

// =============================================================================
// Generators
// =============================================================================

/// Generate a random version.
fn arb_version() -> impl Strategy<Value = Version> {
    (0u64..50, 0u64..50, 0u64..50)
        .prop_map(|(major, minor, patch)| Version::new(major, minor, patch))
}

/// Generate random artifact content (1 to 10KB).
fn arb_artifact_content() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..10240)
}

fn arb_platform() -> impl Strategy<Value = Platform> {
    (
        prop::sample::select(vec!["linux", "macos", "windows"]),
        prop::sample::select(vec!["x86_64", "aarch64"]),
    )
        .prop_map(|(os, arch)| Platform { os, arch })
}

/// Asset names mixing installers, checksums and other platforms.
fn arb_asset_names() -> impl Strategy<Value = Vec<String>> {
    let os = prop::sample::select(vec!["linux", "macos", "darwin", "windows", "freebsd"]);
    let arch = prop::sample::select(vec!["x86_64", "amd64", "arm64", "aarch64", "universal"]);
    let ext = prop::sample::select(vec![
        ".AppImage", ".exe", ".msi", ".dmg", ".pkg", ".tar.gz", ".sha256", ".sig",
    ]);
    prop::collection::vec(
        (os, arch, ext).prop_map(|(os, arch, ext)| format!("arrdesk-1.0.0-{os}-{arch}{ext}")),
        0..12,
    )
}

// =============================================================================
// Helper Functions
// =============================================================================

fn write_temp(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

fn feed(tag: String) -> FeedRelease {
    FeedRelease {
        tag_name: tag,
        name: None,
        body: None,
        html_url: None,
        published_at: None,
        assets: vec![FeedAsset {
            name: "arrdesk-linux-x86_64.AppImage".into(),
            browser_download_url: "http://localhost/a".into(),
            size: 1,
            digest: None,
        }],
    }
}

// =============================================================================
// Property 1: Artifact Hash Verification
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Content verifies against its own size and digest.
    #[test]
    fn prop_correct_artifact_accepted(content in arb_artifact_content()) {
        let file = write_temp(&content);
        let verifier = ArtifactVerifier::new(Some(content.len() as u64), Some(sha256(&content)));
        prop_assert!(verifier.verify(file.path()).is_ok());
        prop_assert_eq!(compute_hash(file.path()).unwrap(), sha256(&content));
    }

    /// Flipping any single byte makes verification fail.
    #[test]
    fn prop_modified_artifact_rejected(
        content in arb_artifact_content(),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let expected = sha256(&content);
        let mut tampered = content.clone();
        let i = index.index(tampered.len());
        tampered[i] ^= flip;

        let file = write_temp(&tampered);
        let verifier = ArtifactVerifier::new(Some(content.len() as u64), Some(expected));
        let result = verifier.verify(file.path());
        prop_assert!(result.is_err());
        prop_assert!(result.unwrap_err().is_integrity());
    }
}

// =============================================================================
// Property 2: Version Comparison
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// An update is reported exactly when the feed version is newer.
    #[test]
    fn prop_update_iff_newer(
        current in arb_version(),
        latest in arb_version(),
        prefixed in any::<bool>(),
    ) {
        let tag = if prefixed { format!("v{latest}") } else { latest.to_string() };
        prop_assert_eq!(parse_version(&tag).unwrap(), latest.clone());

        let platform = Platform { os: "linux", arch: "x86_64" };
        let release = feed(tag).into_release(&current, &platform).unwrap();
        prop_assert_eq!(release.update_available, latest > current);
        if latest <= current {
            prop_assert_eq!(release, Release::up_to_date(&current));
        } else {
            prop_assert_eq!(release.version, latest);
        }
    }
}

// =============================================================================
// Property 3: Asset Selection
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A selected asset names the platform's OS, carries one of its installer
    /// extensions, and is never a checksum or signature file.
    #[test]
    fn prop_selected_asset_fits_platform(
        names in arb_asset_names(),
        platform in arb_platform(),
    ) {
        let assets: Vec<FeedAsset> = names
            .iter()
            .map(|name| FeedAsset {
                name: name.clone(),
                browser_download_url: format!("http://localhost/{name}"),
                size: 1,
                digest: None,
            })
            .collect();

        if let Some(asset) = select_asset(&assets, &platform) {
            let name = asset.name.to_ascii_lowercase();
            prop_assert!(!name.ends_with(".sha256") && !name.ends_with(".sig"));
            let os_match = match platform.os {
                "macos" => name.contains("macos") || name.contains("darwin"),
                os => name.contains(os),
            };
            prop_assert!(os_match, "{} does not fit {}", name, platform);
            prop_assert!(
                platform.installer_extensions().iter().any(|ext| name.ends_with(ext)),
                "{} is not an installer for {}", name, platform
            );
        }
    }
}
