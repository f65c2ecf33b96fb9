mod common;

use std::cell::Cell;

use intel_import::{
    ImportError,
    import::CsvImporter,
    import_csv,
    mapping::MatchKind,
    store::{TableSchema, TableStore},
    synonyms::SynonymTable,
};
use rusqlite::Connection;

use common::{TestWorkspace, count, dump_rows};

const TICKET_COLUMNS: &[&str] = &["ticket_id", "priority", "status", "subject"];

#[test]
fn exact_header_rows_are_inserted_once_and_rerun_is_a_no_op() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_database();
    let csv = ws.write(
        "it_tickets.csv",
        "ticket_id,priority,status,subject\n\
         T-001,High,Open,VPN down\n\
         T-002,Low,Closed,Printer jam\n\
         T-003,Medium,Open,Password reset\n",
    );

    let first = import_csv(&mut conn, &csv, "it_tickets").expect("first import");
    assert_eq!(first.rows_read, 3);
    assert_eq!(first.rows_inserted, 3);
    assert_eq!(first.rows_ignored(), 0);

    let second = import_csv(&mut conn, &csv, "it_tickets").expect("rerun");
    assert_eq!(second.rows_read, 3);
    assert_eq!(second.rows_inserted, 0);
    assert_eq!(second.rows_ignored(), 3);
    assert_eq!(count(&conn, "it_tickets"), 3);
}

#[test]
fn synonym_headers_map_and_unknown_headers_drop() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_bare_database();
    conn.execute_batch(
        "CREATE TABLE incidents (incident_type TEXT, date TEXT, description TEXT, \
         UNIQUE (incident_type, date));",
    )
    .expect("create table");
    let csv = ws.write(
        "incidents.csv",
        "Type,Date Reported,Notes\nPhishing,2024-11-05,clicked a link\nMalware,2024-11-06,\n",
    );

    let report = import_csv(&mut conn, &csv, "incidents").expect("import");
    assert_eq!(report.rows_inserted, 2);
    assert_eq!(report.mapping.target_for("Type"), Some("incident_type"));
    assert_eq!(report.mapping.target_for("Date Reported"), Some("date"));
    assert_eq!(report.mapping.target_for("Notes"), None);
    assert!(
        report
            .mapping
            .columns()
            .iter()
            .all(|c| c.kind == MatchKind::Synonym)
    );

    let rows = dump_rows(&conn, "incidents", &["incident_type", "date", "description"]);
    assert_eq!(
        rows,
        vec![
            vec![Some("Malware".to_string()), Some("2024-11-06".to_string()), None],
            vec![Some("Phishing".to_string()), Some("2024-11-05".to_string()), None],
        ]
    );
}

#[test]
fn no_common_columns_reports_no_mappable_columns_and_leaves_table_alone() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_database();
    let csv = ws.write("weather.csv", "city,temperature\nLondon,12\n");

    let err = import_csv(&mut conn, &csv, "it_tickets").expect_err("nothing maps");
    assert!(matches!(err, ImportError::NoMappableColumns { ref table } if table == "it_tickets"));
    assert!(err.to_string().starts_with("skipped: no matching columns"));
    assert_eq!(count(&conn, "it_tickets"), 0);
}

#[derive(Default)]
struct RecordingStore {
    introspections: Cell<usize>,
    inserts: usize,
}

impl TableStore for RecordingStore {
    fn table_schema(&self, table: &str) -> rusqlite::Result<TableSchema> {
        self.introspections.set(self.introspections.get() + 1);
        Ok(TableSchema {
            table: table.to_string(),
            columns: Vec::new(),
        })
    }

    fn insert_or_ignore(
        &mut self,
        _table: &str,
        _columns: &[&str],
        _rows: &[Vec<Option<String>>],
    ) -> rusqlite::Result<usize> {
        self.inserts += 1;
        Ok(0)
    }
}

#[test]
fn missing_file_issues_no_queries() {
    let ws = TestWorkspace::new();
    let mut store = RecordingStore::default();

    let err = import_csv(&mut store, &ws.path().join("absent.csv"), "it_tickets")
        .expect_err("file is missing");
    assert!(matches!(err, ImportError::FileMissing { .. }));
    assert!(err.to_string().starts_with("skipped: file not found"));
    assert_eq!(store.introspections.get(), 0);
    assert_eq!(store.inserts, 0);
}

#[test]
fn malformed_file_reports_parse_error_before_touching_the_store() {
    let ws = TestWorkspace::new();
    let mut store = RecordingStore::default();
    let csv = ws.write("broken.csv", "ticket_id,priority\nT-1,High,extra\n");

    let err = import_csv(&mut store, &csv, "it_tickets").expect_err("wide row");
    match &err {
        ImportError::Parse { reason, .. } => assert!(reason.contains("Row 2")),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().starts_with("skipped: parse error"));
    assert_eq!(store.introspections.get(), 0);
}

#[test]
fn unknown_table_is_an_introspection_failure() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_database();
    let csv = ws.write("tickets.csv", "ticket_id\nT-1\n");

    let err = import_csv(&mut conn, &csv, "no_such_table").expect_err("missing table");
    assert!(matches!(err, ImportError::SchemaIntrospection { .. }));
    assert!(!err.is_skip());
}

#[test]
fn overlapping_rows_across_files_are_stored_once() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_database();
    let january = ws.write(
        "january.csv",
        "Ticket ID,Priority,Subject\nT-100,High,Disk full\nT-101,Low,New laptop\n",
    );
    let february = ws.write(
        "february.csv",
        "ticket-id,priority,title\nT-101,Low,New laptop\nT-102,Medium,Email bounce\n",
    );

    let first = import_csv(&mut conn, &january, "it_tickets").expect("january");
    let second = import_csv(&mut conn, &february, "it_tickets").expect("february");

    assert_eq!(first.rows_inserted, 2);
    assert_eq!(second.rows_inserted, 1);
    assert_eq!(count(&conn, "it_tickets"), 3);
    let stored: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM it_tickets WHERE ticket_id = 'T-101'",
            [],
            |row| row.get(0),
        )
        .expect("count overlap");
    assert_eq!(stored, 1);
}

#[test]
fn insert_or_ignore_keeps_existing_values() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_database();
    let original = ws.write("a.csv", "ticket_id,status\nT-1,Open\n");
    let changed = ws.write("b.csv", "ticket_id,status\nT-1,Closed\n");

    import_csv(&mut conn, &original, "it_tickets").expect("original");
    let report = import_csv(&mut conn, &changed, "it_tickets").expect("changed");
    assert_eq!(report.rows_inserted, 0);

    let rows = dump_rows(&conn, "it_tickets", &["ticket_id", "status"]);
    assert_eq!(rows, vec![vec![Some("T-1".to_string()), Some("Open".to_string())]]);
}

#[test]
fn column_order_does_not_change_inserted_rows() {
    let ws = TestWorkspace::new();
    let forward = ws.write(
        "forward.csv",
        "ticket_id,priority,status,subject\nT-1,High,Open,VPN\nT-2,Low,,Mouse\n",
    );
    let shuffled = ws.write(
        "shuffled.csv",
        "subject,status,ticket_id,priority\nVPN,Open,T-1,High\nMouse,,T-2,Low\n",
    );

    let mut left = Connection::open_in_memory().expect("left db");
    intel_import::schema::create_all_tables(&mut left).expect("left schema");
    let mut right = Connection::open_in_memory().expect("right db");
    intel_import::schema::create_all_tables(&mut right).expect("right schema");

    import_csv(&mut left, &forward, "it_tickets").expect("forward import");
    import_csv(&mut right, &shuffled, "it_tickets").expect("shuffled import");

    assert_eq!(
        dump_rows(&left, "it_tickets", TICKET_COLUMNS),
        dump_rows(&right, "it_tickets", TICKET_COLUMNS)
    );
}

#[test]
fn competing_synonym_headers_store_the_same_value_in_any_order() {
    let ws = TestWorkspace::new();
    let forward = ws.write(
        "forward.csv",
        "subject,name,date,type\nVPN down,Alice,2024-01-01,Phishing\n",
    );
    let swapped = ws.write(
        "swapped.csv",
        "name,subject,date,type\nAlice,VPN down,2024-01-01,Phishing\n",
    );

    let mut left = Connection::open_in_memory().expect("left db");
    intel_import::schema::create_all_tables(&mut left).expect("left schema");
    let mut right = Connection::open_in_memory().expect("right db");
    intel_import::schema::create_all_tables(&mut right).expect("right schema");

    import_csv(&mut left, &forward, "cyber_incidents").expect("forward import");
    import_csv(&mut right, &swapped, "cyber_incidents").expect("swapped import");

    let columns = &["title", "date", "incident_type"];
    let stored = dump_rows(&left, "cyber_incidents", columns);
    assert_eq!(stored, dump_rows(&right, "cyber_incidents", columns));
    assert_eq!(
        stored,
        vec![vec![
            Some("VPN down".to_string()),
            Some("2024-01-01".to_string()),
            Some("Phishing".to_string()),
        ]]
    );
}

#[test]
fn incident_export_layout_maps_every_header() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_database();
    let csv = ws.write(
        "cyber_incidents.csv",
        "Title,Date,Affiliations,Description,Response,Victims,Sponsor,Type,Category,Sources_1\n\
         Op Aurora,2009-12-01,APT17,Source theft,Disclosure,Google,China,Espionage,Intrusion,https://example.org/a\n",
    );

    let report = import_csv(&mut conn, &csv, "cyber_incidents").expect("import");
    assert!(report.mapping.dropped().is_empty());
    assert_eq!(report.mapping.target_for("Type"), Some("incident_type"));
    assert_eq!(report.mapping.target_for("Sources_1"), Some("sources_1"));
    assert_eq!(report.rows_inserted, 1);
    assert_eq!(
        dump_rows(
            &conn,
            "cyber_incidents",
            &["affiliations", "victims", "sponsor", "category", "sources_1", "sources_2"]
        ),
        vec![vec![
            Some("APT17".to_string()),
            Some("Google".to_string()),
            Some("China".to_string()),
            Some("Intrusion".to_string()),
            Some("https://example.org/a".to_string()),
            None,
        ]]
    );
}

#[test]
fn short_rows_fill_missing_fields_with_null() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_database();
    let csv = ws.write("short.csv", "ticket_id,priority,status\nT-9,High\n");

    let report = import_csv(&mut conn, &csv, "it_tickets").expect("import");
    assert_eq!(report.rows_inserted, 1);
    let rows = dump_rows(&conn, "it_tickets", &["ticket_id", "priority", "status"]);
    assert_eq!(
        rows,
        vec![vec![Some("T-9".to_string()), Some("High".to_string()), None]]
    );
}

#[test]
fn numeric_text_follows_column_affinity() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_database();
    let datasets = ws.write(
        "datasets.csv",
        "Dataset Name,File Type,Size MB\ncustomers,csv,12.5\n",
    );
    let tickets = ws.write("tickets.csv", "ticket_id,priority\n000123,High\n");

    import_csv(&mut conn, &datasets, "datasets_metadata").expect("datasets");
    import_csv(&mut conn, &tickets, "it_tickets").expect("tickets");

    let size: f64 = conn
        .query_row(
            "SELECT size_mb FROM datasets_metadata WHERE dataset_name = 'customers'",
            [],
            |row| row.get(0),
        )
        .expect("size");
    assert_eq!(size, 12.5);
    let ticket: String = conn
        .query_row("SELECT ticket_id FROM it_tickets", [], |row| row.get(0))
        .expect("ticket id");
    assert_eq!(ticket, "000123");
}

#[test]
fn tab_separated_files_detected_by_extension() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_database();
    let tsv = ws.write("tickets.tsv", "ticket_id\tpriority\nT-1\tHigh\n");

    let report = import_csv(&mut conn, &tsv, "it_tickets").expect("import");
    assert_eq!(report.rows_inserted, 1);
}

#[test]
fn custom_synonyms_extend_the_defaults() {
    let ws = TestWorkspace::new();
    let mut conn = ws.open_database();
    let csv = ws.write(
        "datasets.csv",
        "name,format\nsales,parquet\n",
    );
    let mut synonyms = SynonymTable::default();
    synonyms.insert("name", "dataset_name");
    synonyms.insert("format", "file_type");
    let importer = CsvImporter::new().with_synonyms(synonyms);

    let report = importer
        .import_csv(&mut conn, &csv, "datasets_metadata")
        .expect("import");
    assert_eq!(report.rows_inserted, 1);
    let rows = dump_rows(&conn, "datasets_metadata", &["dataset_name", "file_type"]);
    assert_eq!(
        rows,
        vec![vec![Some("sales".to_string()), Some("parquet".to_string())]]
    );
}

#[test]
fn plan_resolves_without_inserting() {
    let ws = TestWorkspace::new();
    let conn = ws.open_database();
    let csv = ws.write("tickets.csv", "Ticket ID,Subject,Owner\nT-1,VPN,ana\n");

    let plan = CsvImporter::new()
        .plan(&conn, &csv, "it_tickets")
        .expect("plan");
    assert_eq!(plan.mapping.target_columns(), vec!["ticket_id", "subject"]);
    assert_eq!(plan.mapping.dropped(), ["Owner".to_string()]);
    assert_eq!(
        plan.rows(),
        vec![vec![Some("T-1".to_string()), Some("VPN".to_string())]]
    );
    assert_eq!(count(&conn, "it_tickets"), 0);
}
