//! End-to-end flows through the configured backend.

use budgetit_backend::config::{AppConfig, CONFIG_FILE_NAME};
use budgetit_backend::domain::validation::{self, ExpenseInput, ValidationError};
use budgetit_backend::domain::{LoginResult, Outcome, StateEvent, LEGACY_KEY};
use budgetit_backend::{initialize_backend, FileStorage, KeyValueStorage};
use chrono::{Days, Local};
use shared::{default_categories, DATE_FORMAT, FALLBACK_CATEGORY};
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;

fn backend(dir: &TempDir) -> budgetit_backend::BudgetApp<FileStorage> {
    let config = AppConfig::load_from(dir.path()).unwrap();
    initialize_backend(&config).unwrap()
}

#[test]
fn new_profile_starts_with_defaults() {
    let dir = TempDir::new().unwrap();
    let mut app = backend(&dir);

    let id = app.create_profile("Alice", None).unwrap();

    assert_eq!(app.store().active_profile_id(), Some(id.as_str()));
    assert_eq!(app.store().categories(), default_categories().as_slice());
    assert!(app.store().budgets().is_empty());
}

#[test]
fn removing_a_category_moves_its_expense_to_fallback() {
    let dir = TempDir::new().unwrap();
    let mut app = backend(&dir);
    app.create_profile("Alice", None).unwrap();
    for category in ["Trasporti", "Casa", "Svago", "Salute"] {
        app.remove_category(category).unwrap();
    }
    assert_eq!(app.store().categories(), &["Alimentari".to_string(), "Altro".to_string()]);

    let today = Local::now().date_naive();
    let expense = validation::validate_expense(
        &ExpenseInput {
            name: "Spesa".to_string(),
            amount: "12.50".to_string(),
            category: "Alimentari".to_string(),
            date: today.format(DATE_FORMAT).to_string(),
            notes: String::new(),
        },
        today,
    )
    .unwrap();
    app.add_expense(expense).unwrap();

    app.remove_category("Alimentari").unwrap();

    assert_eq!(app.store().categories(), &[FALLBACK_CATEGORY.to_string()]);
    assert_eq!(app.store().expenses()[0].category, FALLBACK_CATEGORY);
    assert_eq!(app.store().expenses()[0].amount, 12.5);
    assert!(!app.store().budgets().contains_key("Alimentari"));
}

#[test]
fn last_budget_write_wins() {
    let dir = TempDir::new().unwrap();
    let mut app = backend(&dir);
    app.create_profile("Alice", None).unwrap();

    app.set_budget("Casa", 300.0).unwrap();
    app.set_budget("Casa", 250.0).unwrap();

    assert_eq!(app.store().budgets()["Casa"], 250.0);
}

#[test]
fn pin_protected_login() {
    let dir = TempDir::new().unwrap();
    let mut app = backend(&dir);
    let alice = app.create_profile("Alice", None).unwrap();
    let bob = app.create_profile("Bob", Some("1234")).unwrap();

    assert!(!app.store().verify_pin(&bob, "0000"));
    assert!(app.store().verify_pin(&bob, "1234"));

    app.login(&alice, "").unwrap();
    assert_eq!(app.login(&bob, "0000").unwrap(), LoginResult::WrongPin);
    assert_eq!(app.store().active_profile_id(), Some(alice.as_str()));
    assert_eq!(app.login(&bob, "1234").unwrap(), LoginResult::Granted);
}

#[test]
fn legacy_record_becomes_active_profile() {
    let dir = TempDir::new().unwrap();
    let mut storage = FileStorage::new(dir.path()).unwrap();
    storage
        .set(
            LEGACY_KEY,
            r#"{"expenses": [
                {"name": "Caffè", "amount": 1.2, "category": "X", "date": "2024-01-10"},
                {"name": "Libro", "amount": "15", "category": "X", "date": "2024-01-12"}
            ], "categories": ["X"], "budgets": {}}"#,
        )
        .unwrap();

    let app = backend(&dir);
    let profiles = app.store().profiles();

    assert_eq!(profiles.len(), 1);
    assert_eq!(app.store().active_profile_id(), Some(profiles[0].id.as_str()));
    assert_eq!(app.store().categories(), &["X".to_string()]);
    assert_eq!(app.store().expenses().len(), 2);
    assert!(app.store().expenses().iter().all(|e| !e.id.is_empty()));
}

#[test]
fn future_expense_is_rejected_before_the_store() {
    let dir = TempDir::new().unwrap();
    let mut app = backend(&dir);
    app.create_profile("Alice", None).unwrap();

    let today = Local::now().date_naive();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap();
    let result = validation::validate_expense(
        &ExpenseInput {
            name: "Concerto".to_string(),
            amount: "40".to_string(),
            category: "Svago".to_string(),
            date: tomorrow.format(DATE_FORMAT).to_string(),
            notes: String::new(),
        },
        today,
    );

    assert_eq!(result, Err(ValidationError::FutureDate(tomorrow)));
    assert!(app.store().expenses().is_empty());
}

#[test]
fn listeners_follow_profile_switches() {
    let dir = TempDir::new().unwrap();
    let mut app = backend(&dir);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    app.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    let alice = app.create_profile("Alice", None).unwrap();
    app.logout().unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            StateEvent::StateReset,
            StateEvent::ProfileChanged { profile_id: alice },
            StateEvent::StateReset,
        ]
    );
    assert_eq!(app.logout().unwrap(), Outcome::Applied(()));
}

#[test]
fn configured_defaults_apply_to_new_profiles() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "default_currency: gbp\nstorage_key: budget_test\n",
    )
    .unwrap();

    let mut app = backend(&dir);
    app.create_profile("Alice", None).unwrap();

    assert_eq!(app.store().settings().unwrap().currency, "GBP");
    assert!(dir.path().join("budget_test.json").exists());
}
