//! Unit tests for the archiver
//!
//! Archives are read back with the zip and bzip2 crates to check the
//! container holds exactly the dump.

use chrono::NaiveDate;
use db_backup_manager::utils::{ArchiveOperations, DumpArtifact, FsArchiver};
use rstest::rstest;
use std::fs;
use std::io::Read;
use test_utils::{sample_target, ArchiveFormat, ArchiveLayout, ConfigBuilder, TestContext};

const DUMP: &[u8] = b"-- MySQL dump\nCREATE TABLE t (id INT);\n";

fn write_dump(layout: &ArchiveLayout, name: &str) -> DumpArtifact {
    let stamp = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 30, 45)
        .unwrap();
    let path = layout.raw_dump_path(name, &stamp);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, DUMP).unwrap();

    DumpArtifact {
        path,
        size_bytes: DUMP.len() as u64,
    }
}

fn read_back(path: &std::path::Path, format: ArchiveFormat) -> (Option<String>, Vec<u8>) {
    let file = fs::File::open(path).unwrap();
    let mut content = Vec::new();

    match format {
        ArchiveFormat::Zip => {
            let mut archive = zip::ZipArchive::new(file).unwrap();
            assert_eq!(archive.len(), 1, "archive must hold exactly one entry");
            let mut entry = archive.by_index(0).unwrap();
            entry.read_to_end(&mut content).unwrap();
            (Some(entry.name().to_string()), content)
        }
        ArchiveFormat::Bzip2 => {
            bzip2::read::BzDecoder::new(file).read_to_end(&mut content).unwrap();
            (None, content)
        }
    }
}

#[rstest]
#[case::zip(ArchiveFormat::Zip, "sql.zip")]
#[case::bzip2(ArchiveFormat::Bzip2, "sql.bz2")]
fn test_archive_holds_dump(#[case] format: ArchiveFormat, #[case] extension: &str) {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().with_compression(format));
    let layout = ctx.layout();
    let target = sample_target("shop", 3);
    let artifact = write_dump(&layout, "shop");
    let stamp = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 30, 45)
        .unwrap();

    let archive = FsArchiver::new(layout.clone())
        .archive(&target, &artifact, stamp)
        .unwrap();

    assert_eq!(
        archive.path.file_name().unwrap().to_string_lossy(),
        format!("shop_20240601_123045.{}", extension)
    );
    assert!(!artifact.path.exists(), "raw dump must be removed");

    let (entry_name, content) = read_back(&archive.path, format);
    assert_eq!(content, DUMP);
    if let Some(name) = entry_name {
        assert_eq!(name, "shop_20240601_123045.sql");
    }
}

#[test]
fn test_target_dir_only_holds_final_archive() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let layout = ctx.layout();
    let artifact = write_dump(&layout, "shop");
    let stamp = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 30, 45)
        .unwrap();

    FsArchiver::new(layout.clone())
        .archive(&sample_target("shop", 3), &artifact, stamp)
        .unwrap();

    assert_eq!(
        test_utils::archive_names(&layout, "shop"),
        vec!["shop_20240601_123045.sql.zip"]
    );
}
