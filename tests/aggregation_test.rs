//! Integration tests for the stat aggregation engine against a scratch
//! SQLite database.
//!
//! These tests:
//! 1. Declare tables and materialize their backing relations
//! 2. Insert known rows for a handful of geographies
//! 3. Verify `get_stat_data` / `raw_data_for_geos` output shapes and values

use serde_json::json;
use tempfile::NamedTempFile;

use census_tables::{
    DataStore, EngineError, FieldTableDef, Geography, SimpleTableDef, StatParams, StatType, Table,
    TotalSpec,
};

// =============================================================================
// Fixtures
// =============================================================================

struct Fixture {
    _db: NamedTempFile,
    store: DataStore,
    table: Table,
}

fn cape_town() -> Geography {
    Geography::new("municipality", "CPT", "2011")
}

fn buffalo_city() -> Geography {
    Geography::new("municipality", "BUF", "2011")
}

/// Gender table with one row for Cape Town: male 30, female 70, total 100.
fn gender_fixture() -> Fixture {
    let db = NamedTempFile::new().expect("Failed to create temp database");
    let store = DataStore::open(db.path()).expect("Failed to open store");

    let table = SimpleTableDef::new("gender", "Population", "Population by gender").build();
    store
        .create_table(&table, &["male", "female", "total"])
        .expect("Failed to create backing relation");
    store
        .insert_row(
            &table,
            &cape_town(),
            &[("male", 30), ("female", 70), ("total", 100)],
        )
        .expect("Failed to insert row");

    Fixture {
        _db: db,
        store,
        table,
    }
}

// =============================================================================
// get_stat_data: percentages, totals, recoding
// =============================================================================

#[test]
fn test_percentages_with_summed_denominator() {
    let fx = gender_fixture();
    let params = StatParams::default().fields(&["male", "female"]);

    let (result, total) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    assert_eq!(total, 100);
    let male = result.get("male").unwrap();
    assert_eq!(male.values.this, 0.30);
    assert_eq!(male.numerators.as_ref().unwrap().this, 30.0);
    let female = result.get("female").unwrap();
    assert_eq!(female.values.this, 0.70);
    assert_eq!(female.numerators.as_ref().unwrap().this, 70.0);
}

#[test]
fn test_recode_accumulates_into_one_key() {
    let fx = gender_fixture();
    let params = StatParams::default()
        .fields(&["male", "female"])
        .recode(&[("male", "total_pop"), ("female", "total_pop")]);

    let (result, total) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    assert_eq!(total, 100);
    assert_eq!(result.len(), 1);
    let merged = result.get("total_pop").unwrap();
    assert_eq!(merged.name, "total_pop");
    assert_eq!(merged.numerators.as_ref().unwrap().this, 100.0);
    assert_eq!(merged.values.this, 1.0);
}

#[test]
fn test_recode_conserves_numerator_sum() {
    let fx = gender_fixture();
    let params = StatParams::default()
        .fields(&["male", "female"])
        .recode(&[("female", "everyone"), ("male", "everyone")]);

    let (result, _) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    let numerator_sum: f64 = result
        .iter()
        .map(|(_, entry)| entry.numerators.as_ref().unwrap().this)
        .sum();
    assert_eq!(numerator_sum, 30.0 + 70.0);
}

#[test]
fn test_absolute_values_without_percent() {
    let fx = gender_fixture();
    let params = StatParams::default()
        .fields(&["male", "female"])
        .percent(false);

    let (result, _) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    let male = result.get("male").unwrap();
    assert_eq!(male.values.this, 30.0);
    assert!(male.numerators.is_none());
    assert_eq!(result.get("female").unwrap().values.this, 70.0);
}

#[test]
fn test_denominator_defaults_to_selected_fields() {
    let fx = gender_fixture();
    let params = StatParams::default().fields(&["male"]);

    let (result, total) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    assert_eq!(total, 30);
    assert_eq!(result.get("male").unwrap().values.this, 1.0);
}

#[test]
fn test_total_column_outside_selected_fields() {
    let fx = gender_fixture();
    let params = StatParams::default()
        .fields(&["male"])
        .total(TotalSpec::Column("total".to_string()));

    let (result, total) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    assert_eq!(total, 100);
    assert_eq!(result.get("male").unwrap().values.this, 0.30);
}

#[test]
fn test_numeric_total_override() {
    let fx = gender_fixture();
    let params = StatParams::default()
        .fields(&["male", "female"])
        .total(TotalSpec::Value(200));

    let (result, total) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    assert_eq!(total, 200);
    assert_eq!(result.get("male").unwrap().values.this, 0.15);
}

#[test]
fn test_zero_denominator_yields_zero_ratios() {
    let fx = gender_fixture();
    let params = StatParams::default()
        .fields(&["male", "female"])
        .total(TotalSpec::Value(0));

    let (result, total) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    assert_eq!(total, 0);
    assert_eq!(result.get("male").unwrap().values.this, 0.0);
    assert_eq!(result.get("female").unwrap().values.this, 0.0);
}

#[test]
fn test_missing_geography_resolves_to_zeros() {
    let fx = gender_fixture();
    let params = StatParams::default().fields(&["male", "female"]);

    let (result, total) = fx
        .table
        .get_stat_data(&fx.store, &buffalo_city(), &params)
        .unwrap();

    assert_eq!(total, 0);
    let male = result.get("male").unwrap();
    assert_eq!(male.values.this, 0.0);
    assert_eq!(male.numerators.as_ref().unwrap().this, 0.0);
}

#[test]
fn test_null_column_value_treated_as_zero() {
    let db = NamedTempFile::new().unwrap();
    let store = DataStore::open(db.path()).unwrap();
    let table = SimpleTableDef::new("gender", "Population", "Population by gender").build();
    store.create_table(&table, &["male", "female", "total"]).unwrap();
    // male and total left NULL
    store
        .insert_row(&table, &cape_town(), &[("female", 70)])
        .unwrap();

    let params = StatParams::default().fields(&["male", "female"]);
    let (result, total) = table.get_stat_data(&store, &cape_town(), &params).unwrap();

    assert_eq!(total, 70);
    assert_eq!(result.get("male").unwrap().numerators.as_ref().unwrap().this, 0.0);
    assert_eq!(result.get("female").unwrap().values.this, 1.0);
}

#[test]
fn test_default_fields_are_all_data_columns() {
    let fx = gender_fixture();

    let (result, _) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &StatParams::default())
        .unwrap();

    let keys: Vec<_> = result.keys().collect();
    assert_eq!(keys, vec!["male", "female", "total"]);
}

#[test]
fn test_empty_field_selection_means_all_columns() {
    let fx = gender_fixture();
    let params = StatParams::default().fields(&[]);

    let (result, total) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    let keys: Vec<_> = result.keys().collect();
    assert_eq!(keys, vec!["male", "female", "total"]);
    assert_eq!(total, 30 + 70 + 100);
}

#[test]
fn test_explicit_key_order() {
    let fx = gender_fixture();
    let params = StatParams::default()
        .fields(&["male", "female"])
        .key_order(&["female", "male"]);

    let (result, _) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    let keys: Vec<_> = result.keys().collect();
    assert_eq!(keys, vec!["female", "male"]);
}

#[test]
fn test_metadata_side_channel() {
    let fx = gender_fixture();
    let params = StatParams::default().fields(&["male"]);

    let (result, _) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    assert_eq!(result.table_id, "GENDER");
    assert_eq!(result.universe, "Population");
    assert_eq!(result.description, "Population by gender");
    assert_eq!(result.stat_type, StatType::Number);
}

// =============================================================================
// Validation errors
// =============================================================================

#[test]
fn test_invalid_field_error_names_offender() {
    let fx = gender_fixture();
    let params = StatParams::default().fields(&["male", "hovercraft"]);

    let err = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap_err();

    match err {
        EngineError::InvalidField { field, table, valid } => {
            assert_eq!(field, "hovercraft");
            assert_eq!(table, "GENDER");
            assert!(valid.contains("male"));
            assert!(valid.contains("female"));
        }
        other => panic!("expected InvalidField, got {:?}", other),
    }
}

#[test]
fn test_invalid_total_column_error() {
    let fx = gender_fixture();
    let params = StatParams::default()
        .fields(&["male"])
        .total(TotalSpec::Column("grand_total".to_string()));

    let err = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::InvalidTotalColumn { column, .. } if column == "grand_total"
    ));
}

// =============================================================================
// raw_data_for_geos
// =============================================================================

#[test]
fn test_raw_data_for_geos() {
    let fx = gender_fixture();

    let data = fx
        .table
        .raw_data_for_geos(&fx.store, &[cape_town(), buffalo_city()])
        .unwrap();

    let cpt = &data["municipality-CPT"];
    assert_eq!(cpt.estimate["male"], 30);
    assert_eq!(cpt.estimate["female"], 70);
    assert_eq!(cpt.estimate["total"], 100);
    assert_eq!(cpt.error["male"], 0);
}

#[test]
fn test_raw_data_seeds_zeros_for_missing_geographies() {
    let fx = gender_fixture();

    let data = fx
        .table
        .raw_data_for_geos(&fx.store, &[buffalo_city()])
        .unwrap();

    let buf = &data["municipality-BUF"];
    assert_eq!(buf.estimate["male"], 0);
    assert_eq!(buf.estimate["female"], 0);
    assert_eq!(buf.estimate["total"], 0);
    assert_eq!(buf.error["female"], 0);
}

#[test]
fn test_raw_data_distinguishes_geo_versions() {
    let fx = gender_fixture();
    let cpt_2016 = Geography::new("municipality", "CPT", "2016");

    // Only the 2011 delineation has data.
    let data = fx.table.raw_data_for_geos(&fx.store, &[cpt_2016]).unwrap();
    assert_eq!(data["municipality-CPT"].estimate["male"], 0);
}

// =============================================================================
// Field tables
// =============================================================================

#[test]
fn test_field_table_combination_columns() {
    let db = NamedTempFile::new().unwrap();
    let store = DataStore::open(db.path()).unwrap();

    let table = FieldTableDef::new(&["gender", "age group"])
        .universe("Population 18 years and over")
        .display_name("female_under_18", "Female, < 18")
        .build()
        .unwrap();
    assert_eq!(table.id(), "AGEGROUP_GENDER");

    // Combination columns come from the schema-builder collaborator; the
    // engine consumes whatever the backing relation declares.
    store
        .create_table(
            &table,
            &["total", "female", "female_under_18", "male", "male_under_18"],
        )
        .unwrap();
    store
        .insert_row(
            &table,
            &cape_town(),
            &[
                ("total", 100),
                ("female", 60),
                ("female_under_18", 25),
                ("male", 40),
                ("male_under_18", 15),
            ],
        )
        .unwrap();

    let columns = table.columns(&store).unwrap();
    assert_eq!(columns.get("female_under_18").unwrap().name, "Female, < 18");
    assert_eq!(columns.get("total").unwrap().indent, 0);
    assert_eq!(columns.get("female").unwrap().indent, 1);

    let params = StatParams::default()
        .fields(&["female", "male"])
        .total(TotalSpec::Column("total".to_string()));
    let (result, total) = table.get_stat_data(&store, &cape_town(), &params).unwrap();
    assert_eq!(total, 100);
    assert_eq!(result.get("female").unwrap().values.this, 0.60);
    assert_eq!(result.get("male").unwrap().values.this, 0.40);
}

// =============================================================================
// Serialization shape
// =============================================================================

#[test]
fn test_result_serializes_as_ordered_map() {
    let fx = gender_fixture();
    let params = StatParams::default().fields(&["male", "female"]).percent(false);

    let (result, _) = fx
        .table
        .get_stat_data(&fx.store, &cape_town(), &params)
        .unwrap();

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["table_id"], json!("GENDER"));
    assert_eq!(value["stat_type"], json!("number"));
    assert_eq!(value["entries"]["male"]["values"]["this"], json!(30.0));
    assert_eq!(value["entries"]["male"]["name"], json!("Male"));
    // numerators key is absent entirely in absolute mode
    assert!(value["entries"]["male"].get("numerators").is_none());
}
