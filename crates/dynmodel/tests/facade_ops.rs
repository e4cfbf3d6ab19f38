use std::sync::Arc;

use dynmodel::prelude::*;

fn registry() -> Arc<ModelRegistry> {
    Arc::new(
        ModelRegistry::builder()
            .model(
                ModelType::new("User")
                    .field(
                        FieldDef::new("id", FieldType::BigInt)
                            .primary_key()
                            .auto_increment(),
                    )
                    .field(FieldDef::new("name", FieldType::Text))
                    .field(FieldDef::new("age", FieldType::BigInt).nullable())
                    .field(FieldDef::new("email", FieldType::Text).nullable().unique()),
            )
            .build()
            .expect("registry builds"),
    )
}

fn session() -> Session {
    Session::new(registry())
}

#[test]
fn create_then_get_returns_equal_record() {
    let mut session = session();

    let peter = facade::create(
        &mut session,
        "User",
        values!["name" => "Peter", "age" => 20],
    )
    .expect("create peter");
    let key = peter.key().expect("created record has a key");
    assert_eq!(key, RecordKey::Int(1));

    let fetched = facade::get(&session, "User", key)
        .expect("get succeeds")
        .expect("peter exists");
    assert_eq!(fetched.get("name").and_then(Value::as_str), Some("Peter"));
    assert_eq!(fetched.get("age").and_then(Value::as_i64), Some(20));
}

#[test]
fn get_missing_key_is_absent_not_an_error() {
    let session = session();
    let missing = facade::get(&session, "User", 999).expect("get never fails on a missing key");
    assert!(missing.is_none());
}

#[test]
fn get_with_non_key_value_is_absent() {
    let mut session = session();
    facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create peter");

    // Doubles and nulls can never address a row.
    assert!(facade::get(&session, "User", 1.5).expect("get").is_none());
    assert!(facade::get(&session, "User", Value::Null)
        .expect("get")
        .is_none());
    // A text key simply misses on an integer-keyed model.
    assert!(facade::get(&session, "User", "1").expect("get").is_none());
}

#[test]
fn unknown_model_is_reported_by_every_operation() {
    let mut session = session();
    let ghost = Error::UnknownModel {
        name: "Ghost".to_string(),
    };

    assert_eq!(facade::get(&session, "Ghost", 1).unwrap_err(), ghost);
    assert_eq!(
        facade::create(&mut session, "Ghost", values![]).unwrap_err(),
        ghost
    );
    assert_eq!(
        facade::query(&session, "Ghost", values![]).unwrap_err(),
        ghost
    );
    assert_eq!(facade::one(&session, "Ghost", values![]).unwrap_err(), ghost);
    assert_eq!(
        facade::every(&session, "Ghost", values![]).unwrap_err(),
        ghost
    );
    assert_eq!(
        facade::one_or_create(&mut session, "Ghost", values![]).unwrap_err(),
        ghost
    );
}

#[test]
fn every_without_filters_returns_all_in_creation_order() {
    let mut session = session();
    facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");
    facade::create(&mut session, "User", values!["name" => "John"]).expect("create");
    facade::create(&mut session, "User", values!["name" => "Mary"]).expect("create");

    let all = facade::every(&session, "User", values![]).expect("every");
    let names: Vec<Option<&str>> = all
        .iter()
        .map(|row| row.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec![Some("Peter"), Some("John"), Some("Mary")]);
}

#[test]
fn filters_are_conjunctive() {
    let mut session = session();
    facade::create(
        &mut session,
        "User",
        values!["name" => "Peter", "age" => 20],
    )
    .expect("create");
    facade::create(&mut session, "User", values!["name" => "John", "age" => 20]).expect("create");
    facade::create(
        &mut session,
        "User",
        values!["name" => "Peter", "age" => 31],
    )
    .expect("create");

    let rows = facade::every(
        &session,
        "User",
        values!["name" => "Peter", "age" => 20],
    )
    .expect("every");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("id").and_then(Value::as_i64),
        Some(1),
        "only the first row matches both filters"
    );
}

#[test]
fn filtering_on_unknown_field_fails_at_composition() {
    let mut session = session();
    facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");

    let err = facade::every(&session, "User", values!["nickname" => "pete"]).unwrap_err();
    assert_eq!(
        err,
        Error::UnknownField {
            model: "User".to_string(),
            field: "nickname".to_string()
        }
    );
}

#[test]
fn one_distinguishes_none_one_and_many() {
    let mut session = session();

    let none = facade::one(&session, "User", values!["name" => "Peter"]).expect("one");
    assert!(none.is_none());

    facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");
    let hit = facade::one(&session, "User", values!["name" => "Peter"])
        .expect("one")
        .expect("one match");
    assert_eq!(hit.get("id").and_then(Value::as_i64), Some(1));

    facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");
    let err = facade::one(&session, "User", values!["name" => "Peter"]).unwrap_err();
    assert_eq!(
        err,
        Error::MultipleRows {
            model: "User".to_string(),
            found: 2
        }
    );
}

#[test]
fn one_or_create_creates_once_and_then_reuses() {
    let mut session = session();

    let first = facade::one_or_create(
        &mut session,
        "User",
        values!["name" => "Peter", "age" => 20],
    )
    .expect("first call creates");
    let second = facade::one_or_create(
        &mut session,
        "User",
        values!["name" => "Peter", "age" => 20],
    )
    .expect("second call fetches");

    assert_eq!(first.key(), second.key());
    assert_eq!(facade::every(&session, "User", values![]).expect("every").len(), 1);

    // Different values make a different row.
    facade::one_or_create(&mut session, "User", values!["name" => "John", "age" => 20])
        .expect("third call creates");
    assert_eq!(facade::every(&session, "User", values![]).expect("every").len(), 2);
}

#[test]
fn one_or_create_propagates_ambiguity() {
    let mut session = session();
    facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");
    facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");

    let err =
        facade::one_or_create(&mut session, "User", values!["name" => "Peter"]).unwrap_err();
    assert!(matches!(err, Error::MultipleRows { found: 2, .. }));
    // The ambiguity is reported before anything new is written.
    assert_eq!(facade::every(&session, "User", values![]).expect("every").len(), 2);
}

#[test]
fn change_persists_updated_fields() {
    let mut session = session();
    let mut user = facade::create(
        &mut session,
        "User",
        values!["name" => "Peter", "age" => 20],
    )
    .expect("create");
    let key = user.key().expect("key");

    facade::change(
        &mut session,
        &mut user,
        values!["name" => "John", "age" => 21],
    )
    .expect("change");

    let fetched = facade::get(&session, "User", key)
        .expect("get")
        .expect("row still there");
    assert_eq!(fetched.get("name").and_then(Value::as_str), Some("John"));
    assert_eq!(fetched.get("age").and_then(Value::as_i64), Some(21));
    assert_eq!(
        facade::every(&session, "User", values![]).expect("every").len(),
        1,
        "change updates in place"
    );
}

#[test]
fn change_on_a_fetched_copy_updates_the_row() {
    let mut session = session();
    facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");

    // Fetched copies carry the row's identity, so editing one is an
    // update, not a colliding insert.
    let mut copy = facade::get(&session, "User", 1).expect("get").expect("row");
    facade::change(&mut session, &mut copy, values!["name" => "John"]).expect("change");

    let fetched = facade::get(&session, "User", 1).expect("get").expect("row");
    assert_eq!(fetched.get("name").and_then(Value::as_str), Some("John"));
    assert_eq!(facade::every(&session, "User", values![]).expect("every").len(), 1);
}

#[test]
fn change_with_identical_values_is_a_quiet_noop() {
    let mut session = session();
    let mut user = facade::create(
        &mut session,
        "User",
        values!["name" => "Peter", "age" => 20],
    )
    .expect("create");

    facade::change(
        &mut session,
        &mut user,
        values!["name" => "Peter", "age" => 20],
    )
    .expect("change with same values");
    facade::change(&mut session, &mut user, values![]).expect("change with no values");

    let fetched = facade::get(&session, "User", 1).expect("get").expect("row");
    assert_eq!(fetched.get("name").and_then(Value::as_str), Some("Peter"));
    assert_eq!(session.pending_count(), 0);
}

#[test]
fn changing_the_primary_key_moves_the_row() {
    let mut session = session();
    let mut peter = facade::create(
        &mut session,
        "User",
        values!["name" => "Peter", "email" => "p@example.com"],
    )
    .expect("create peter");
    facade::create(&mut session, "User", values!["name" => "John"]).expect("create john");

    facade::change(&mut session, &mut peter, values!["id" => 9]).expect("change id");

    assert_eq!(peter.key(), Some(RecordKey::Int(9)));
    assert!(facade::get(&session, "User", 1).expect("get").is_none());
    let moved = facade::get(&session, "User", 9).expect("get").expect("row moved");
    assert_eq!(moved.get("name").and_then(Value::as_str), Some("Peter"));
    assert_eq!(
        moved.get("email").and_then(Value::as_str),
        Some("p@example.com"),
        "the unique value travels with the row"
    );

    // Still two rows, in their original order.
    let all = facade::every(&session, "User", values![]).expect("every");
    let names: Vec<Option<&str>> = all
        .iter()
        .map(|row| row.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec![Some("Peter"), Some("John")]);
}

#[test]
fn changing_the_primary_key_to_an_occupied_key_fails() {
    let mut session = session();
    let mut peter =
        facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");
    facade::create(&mut session, "User", values!["name" => "John"]).expect("create");

    let err = facade::change(&mut session, &mut peter, values!["id" => 2]).unwrap_err();
    assert_eq!(
        err,
        Error::DuplicateKey {
            model: "User".to_string(),
            key: RecordKey::Int(2)
        }
    );

    // Neither row moved; the rejected move stays pending until rollback.
    assert_eq!(session.pending_count(), 1);
    session.rollback();
    assert_eq!(facade::every(&session, "User", values![]).expect("every").len(), 2);
    let john = facade::get(&session, "User", 2).expect("get").expect("row");
    assert_eq!(john.get("name").and_then(Value::as_str), Some("John"));
}

#[test]
fn change_after_a_key_move_updates_the_moved_row() {
    let mut session = session();
    let mut peter =
        facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");
    facade::change(&mut session, &mut peter, values!["id" => 5]).expect("move");

    facade::change(&mut session, &mut peter, values!["age" => 21]).expect("update");

    assert_eq!(facade::every(&session, "User", values![]).expect("every").len(), 1);
    let row = facade::get(&session, "User", 5).expect("get").expect("row");
    assert_eq!(row.get("age").and_then(Value::as_i64), Some(21));
}

#[test]
fn change_with_unknown_field_leaves_row_alone() {
    let mut session = session();
    let mut user =
        facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");
    let key = user.key().expect("key");

    let err = facade::change(&mut session, &mut user, values!["nickname" => "pete"]).unwrap_err();
    assert_eq!(
        err,
        Error::UnknownField {
            model: "User".to_string(),
            field: "nickname".to_string()
        }
    );

    let fetched = facade::get(&session, "User", key).expect("get").expect("row");
    assert_eq!(fetched.get("name").and_then(Value::as_str), Some("Peter"));
}

#[test]
fn create_with_unknown_field_writes_nothing() {
    let mut session = session();

    let err = facade::create(&mut session, "User", values!["nickname" => "pete"]).unwrap_err();
    assert_eq!(
        err,
        Error::UnknownField {
            model: "User".to_string(),
            field: "nickname".to_string()
        }
    );
    assert!(facade::every(&session, "User", values![]).expect("every").is_empty());
    assert_eq!(session.pending_count(), 0);
}

#[test]
fn create_with_relation_name_as_field_is_rejected() {
    let registry = Arc::new(
        ModelRegistry::builder()
            .model(
                ModelType::new("User")
                    .field(
                        FieldDef::new("id", FieldType::BigInt)
                            .primary_key()
                            .auto_increment(),
                    )
                    .field(FieldDef::new("name", FieldType::Text))
                    .relation(RelationDef::many("posts", "Post")),
            )
            .model(
                ModelType::new("Post")
                    .field(
                        FieldDef::new("id", FieldType::BigInt)
                            .primary_key()
                            .auto_increment(),
                    )
                    .field(FieldDef::new("title", FieldType::Text)),
            )
            .build()
            .expect("registry builds"),
    );
    let mut session = Session::new(registry);

    let err = facade::create(
        &mut session,
        "User",
        values!["name" => "Peter", "posts" => 1],
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::RelationField {
            model: "User".to_string(),
            field: "posts".to_string()
        }
    );
}

#[test]
fn failed_create_keeps_store_and_can_be_rolled_back() {
    let mut session = session();
    facade::create(
        &mut session,
        "User",
        values!["name" => "Peter", "email" => "p@example.com"],
    )
    .expect("create peter");

    let err = facade::create(
        &mut session,
        "User",
        values!["name" => "John", "email" => "p@example.com"],
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::UniqueViolation {
            model: "User".to_string(),
            field: "email".to_string(),
            value: Value::Text("p@example.com".to_string())
        }
    );
    assert_eq!(facade::every(&session, "User", values![]).expect("every").len(), 1);

    // The rejected record stays pending until the session rolls it back.
    assert_eq!(session.pending_count(), 1);
    session.rollback();
    facade::create(
        &mut session,
        "User",
        values!["name" => "Mary", "email" => "m@example.com"],
    )
    .expect("session usable after rollback");
    assert_eq!(facade::every(&session, "User", values![]).expect("every").len(), 2);
}

#[test]
fn explicit_keys_are_honored_and_advance_the_sequence() {
    let mut session = session();

    let manual = facade::create(
        &mut session,
        "User",
        values!["id" => 42, "name" => "Peter"],
    )
    .expect("create with explicit id");
    assert_eq!(manual.key(), Some(RecordKey::Int(42)));

    let next = facade::create(&mut session, "User", values!["name" => "John"]).expect("create");
    assert_eq!(
        next.key(),
        Some(RecordKey::Int(43)),
        "assigned keys never collide with explicit ones"
    );
}

#[test]
fn fetched_records_are_detached_copies() {
    let mut session = session();
    facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");

    let mut copy = facade::get(&session, "User", 1).expect("get").expect("row");
    copy.set("name", "Hacked").expect("set");

    let fresh = facade::get(&session, "User", 1).expect("get").expect("row");
    assert_eq!(
        fresh.get("name").and_then(Value::as_str),
        Some("Peter"),
        "mutating a fetched copy does not touch the store"
    );
}

#[test]
fn query_exposes_composed_filters() {
    let mut session = session();
    facade::create(&mut session, "User", values!["name" => "Peter"]).expect("create");

    let query = facade::query(&session, "User", values!["name" => "Peter"]).expect("query");
    assert_eq!(query.model(), "User");
    assert_eq!(query.filters().len(), 1);
    assert_eq!(query.count(), 1);
}
