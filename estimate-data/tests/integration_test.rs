//! Integration tests for fringe profile loading using the SQLite backend.

use estimate_core::{EstimateRepository, RepositoryError};
use estimate_data::{FringeConstantLoader, FringeLoaderError};
use estimate_db_sqlite::SqliteRepository;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

const TEST_CSV: &str = include_str!("../test-data/fringe_constants.csv");

/// Sets up a test database with migrations run but NO seed data.
async fn setup_test_db() -> SqliteRepository {
    let repo = SqliteRepository::new(":memory:")
        .await
        .expect("Failed to create in-memory database");
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");
    repo
}

#[tokio::test]
async fn test_load_all_profiles() {
    let repo = setup_test_db().await;

    let records = FringeConstantLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    let loaded = FringeConstantLoader::load(&repo, &records)
        .await
        .expect("Failed to load profiles");

    assert_eq!(loaded, 4);
    assert_eq!(repo.list_fringe_constants().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_load_and_retrieve_profile() {
    let repo = setup_test_db().await;

    let records = FringeConstantLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    FringeConstantLoader::load(&repo, &records)
        .await
        .expect("Failed to load profiles");

    let prevailing = repo
        .get_fringe_constant_by_name("prevailing wage")
        .await
        .expect("Failed to get profile");
    assert_eq!(prevailing.name, "Prevailing Wage");
    assert_eq!(prevailing.w_comp_percent, dec!(14));
    assert_eq!(prevailing.payroll_tax_percent, dec!(9.65));
    assert_eq!(prevailing.fringe_amount, dec!(32.75));

    let apprentice = repo.get_fringe_constant_by_name("Apprentice").await.unwrap();
    assert_eq!(apprentice.fringe_amount, dec!(0));
}

#[tokio::test]
async fn test_load_is_idempotent() {
    let repo = setup_test_db().await;
    let records = FringeConstantLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");

    FringeConstantLoader::load(&repo, &records).await.unwrap();
    let first = repo.list_fringe_constants().await.unwrap();
    FringeConstantLoader::load(&repo, &records).await.unwrap();
    let second = repo.list_fringe_constants().await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_load_replaces_seeded_rates() {
    let repo = setup_test_db().await;
    repo.run_seeds(&estimate_db_sqlite::factory::seeds_dir())
        .await
        .expect("Failed to run seeds");
    let seeded = repo.get_fringe_constant_by_name("Union").await.unwrap();
    assert_eq!(seeded.fringe_amount, dec!(18.4));

    let records = FringeConstantLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    FringeConstantLoader::load(&repo, &records).await.unwrap();

    let updated = repo.get_fringe_constant_by_name("Union").await.unwrap();
    assert_eq!(updated.w_comp_percent, dec!(12.5));
    assert_eq!(updated.fringe_amount, dec!(19.10));
    // Seeded "None" is untouched; the CSV adds two new profiles.
    assert_eq!(repo.list_fringe_constants().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_duplicate_names_keep_last_row() {
    let repo = setup_test_db().await;
    let csv = "name,w_comp_percent,payroll_tax_percent,fringe_amount\n\
               Union,12,9.65,18.40\n\
               UNION,12,9.65,20.00\n";

    let records = FringeConstantLoader::parse(csv.as_bytes()).unwrap();
    let loaded = FringeConstantLoader::load(&repo, &records).await.unwrap();

    assert_eq!(loaded, 1);
    let all = repo.list_fringe_constants().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].fringe_amount, dec!(20));
}

#[tokio::test]
async fn test_load_fails_without_migrations() {
    let repo = SqliteRepository::new(":memory:")
        .await
        .expect("Failed to create in-memory database");
    let records = FringeConstantLoader::parse(TEST_CSV.as_bytes()).unwrap();

    let err = FringeConstantLoader::load(&repo, &records)
        .await
        .expect_err("Expected missing table error");

    let FringeLoaderError::Repository(RepositoryError::Database(msg)) = err else {
        panic!("Expected Database error, got {err:?}");
    };
    assert!(msg.contains("no such table"), "unexpected message: {msg}");
}
