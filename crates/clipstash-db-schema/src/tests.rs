use super::*;

#[test]
fn test_reserved_names() {
    assert!(is_reserved_name("sqlite_stat1"));
    assert!(is_reserved_name("SQLITE_sequence"));
    assert!(!is_reserved_name("sqlite"));
    assert!(!is_reserved_name("my_sqlite_table"));
    assert!(!is_reserved_name(""));
}

#[test]
fn test_auto_index_names() {
    assert!(is_auto_index("sqlite_autoindex_clip_1"));
    assert!(!is_auto_index("idx_clip_created_at"));
    assert!(!is_auto_index("sqlite_stat1"));
}

#[test]
fn test_quote_ident() {
    assert_eq!(quote_ident("clip"), "\"clip\"");
    assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
}

#[test]
fn test_base_type() {
    assert_eq!(base_type("TEXT"), "TEXT");
    assert_eq!(base_type("varchar(255)"), "VARCHAR");
    assert_eq!(base_type("DECIMAL (10, 2)"), "DECIMAL");
    assert_eq!(base_type("unsigned   big int"), "UNSIGNED BIG INT");
    assert_eq!(base_type(""), "");
}

#[test]
fn test_known_types() {
    assert!(is_known_type("INTEGER"));
    assert!(is_known_type("nvarchar(100)"));
    assert!(is_known_type("double precision"));
    assert!(is_known_type(""));
    assert!(!is_known_type("JSONB"));
    assert!(!is_known_type("UUID"));
}

#[test]
fn test_affinity_rules() {
    assert_eq!(TypeAffinity::of("INTEGER"), TypeAffinity::Integer);
    assert_eq!(TypeAffinity::of("bigint"), TypeAffinity::Integer);
    assert_eq!(TypeAffinity::of("VARCHAR(32)"), TypeAffinity::Text);
    assert_eq!(TypeAffinity::of("CLOB"), TypeAffinity::Text);
    assert_eq!(TypeAffinity::of("BLOB"), TypeAffinity::Blob);
    assert_eq!(TypeAffinity::of(""), TypeAffinity::Blob);
    assert_eq!(TypeAffinity::of("REAL"), TypeAffinity::Real);
    assert_eq!(TypeAffinity::of("FLOAT"), TypeAffinity::Real);
    assert_eq!(TypeAffinity::of("DOUBLE PRECISION"), TypeAffinity::Real);
    assert_eq!(TypeAffinity::of("NUMERIC"), TypeAffinity::Numeric);
    assert_eq!(TypeAffinity::of("DATETIME"), TypeAffinity::Numeric);
    // "CHARINT" hits the INT rule first, as in SQLite
    assert_eq!(TypeAffinity::of("CHARINT"), TypeAffinity::Integer);
}

#[test]
fn test_synthesized_defaults() {
    assert_eq!(TypeAffinity::of("INTEGER").synthesized_default(), "0");
    assert_eq!(TypeAffinity::of("REAL").synthesized_default(), "0.0");
    assert_eq!(TypeAffinity::of("TEXT").synthesized_default(), "''");
    assert_eq!(TypeAffinity::of("BLOB").synthesized_default(), "x''");
    assert_eq!(TypeAffinity::of("BOOLEAN").synthesized_default(), "NULL");
}

#[test]
fn test_referential_action_parse() {
    assert_eq!(ReferentialAction::parse("CASCADE"), ReferentialAction::Cascade);
    assert_eq!(ReferentialAction::parse("SET NULL"), ReferentialAction::SetNull);
    assert_eq!(ReferentialAction::parse("SetNull"), ReferentialAction::SetNull);
    assert_eq!(
        ReferentialAction::parse("set_default"),
        ReferentialAction::SetDefault
    );
    assert_eq!(ReferentialAction::parse("Restrict"), ReferentialAction::Restrict);
    assert_eq!(ReferentialAction::parse("NO ACTION"), ReferentialAction::NoAction);
    assert_eq!(ReferentialAction::parse("whatever"), ReferentialAction::NoAction);
    assert_eq!(ReferentialAction::SetNull.to_sql(), "SET NULL");
}

#[test]
fn test_primary_key_implies_not_null() {
    let mut col = ColumnDefinition::new(0, "id", "INTEGER").primary_key();
    assert!(col.is_not_null());

    // Even if the flag was left nullable (as PRAGMA table_info reports it)
    col.nullable = true;
    assert!(col.is_not_null());

    let col = ColumnDefinition::new(1, "note", "TEXT");
    assert!(!col.is_not_null());
    assert!(ColumnDefinition::new(2, "qty", "INTEGER").not_null().is_not_null());
}

#[test]
fn test_table_positions_follow_declaration_order() {
    let table = TableDefinition::new("clip")
        .with_column(ColumnDefinition::new(7, "id", "INTEGER").primary_key())
        .with_column(ColumnDefinition::new(7, "content", "TEXT"));
    assert_eq!(table.columns[0].position, 0);
    assert_eq!(table.columns[1].position, 1);
    assert_eq!(table.primary_key_columns().count(), 1);
    assert!(table.has_primary_key());
}

#[test]
fn test_table_lookups_ignore_case() {
    let table = TableDefinition::new("Clip")
        .with_column(ColumnDefinition::new(0, "CreatedAt", "INTEGER"))
        .with_index(IndexDefinition::new("IX_Clip_CreatedAt", "Clip", ["CreatedAt"]));
    assert!(table.column("createdat").is_some());
    assert!(table.index("ix_clip_createdat").is_some());
    assert!(table.column("missing").is_none());
}

#[test]
fn test_schema_is_case_insensitive() {
    let schema: SchemaDefinition = [TableDefinition::new("Clip"), TableDefinition::new("Tag")]
        .into_iter()
        .collect();
    assert_eq!(schema.len(), 2);
    assert!(schema.contains_table("clip"));
    assert_eq!(schema.table("TAG").map(|t| t.name.as_str()), Some("Tag"));

    // Same name, different case: replaces
    let schema = schema.with_table(TableDefinition::new("CLIP"));
    assert_eq!(schema.len(), 2);
    assert_eq!(schema.table("clip").map(|t| t.name.as_str()), Some("CLIP"));
}

#[test]
fn test_schema_preserves_insertion_order() {
    let schema = SchemaDefinition::new()
        .with_table(TableDefinition::new("zeta"))
        .with_table(TableDefinition::new("alpha"));
    let names: Vec<&str> = schema.tables().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha"]);
}

#[test]
fn test_self_reference() {
    let fk = ForeignKeyDefinition::new("ParentId", "collections", "Id");
    assert!(fk.is_self_reference("Collections"));
    assert!(!fk.is_self_reference("Clips"));
}

#[test]
fn test_composite_foreign_key_columns() {
    let fk = ForeignKeyDefinition::new("ClipId, Tag", "ClipTags", "ClipId,Tag");
    assert!(fk.is_composite());
    assert_eq!(fk.columns().collect::<Vec<_>>(), vec!["ClipId", "Tag"]);
    assert_eq!(
        fk.references_columns().collect::<Vec<_>>(),
        vec!["ClipId", "Tag"]
    );

    let implicit = ForeignKeyDefinition::new("ClipId", "Clips", "");
    assert!(!implicit.is_composite());
    assert_eq!(implicit.references_columns().count(), 0);
}
