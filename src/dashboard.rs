//! Device table derivation and per-row reconciliation
//!
//! Rows are always re-derived from the latest authoritative snapshot.
//! Between snapshots, a toggle response may install a *pending override*
//! for its row; the next snapshot discards every override.
//!
//! Several users may hold the same plug at once. A plug in use by someone
//! else never disables Use.

use std::collections::{HashMap, HashSet};

use crate::models::{DeviceRecord, DeviceStatus, PlugAction, PlugStatus};
use crate::session::is_member;

/// Text of the single row shown for an empty plug list
pub const EMPTY_PLACEHOLDER: &str = "No plugs are registered.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRow {
    pub name: String,
    pub ip: Option<String>,
    pub status: DeviceStatus,
    pub active_user_count: u32,
    pub used_by_me: bool,
    pub use_enabled: bool,
    pub leave_enabled: bool,
}

impl DeviceRow {
    pub fn control_enabled(&self, action: PlugAction) -> bool {
        match action {
            PlugAction::On => self.use_enabled,
            PlugAction::Off => self.leave_enabled,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableRow {
    /// Informational row for an empty list; carries no controls
    Placeholder(String),
    Device(DeviceRow),
}

/// Use iff not mine and status known; Leave iff mine and status known
pub fn control_flags(used_by_me: bool, status: DeviceStatus) -> (bool, bool) {
    let unknown = status == DeviceStatus::Unknown;
    (!used_by_me && !unknown, used_by_me && !unknown)
}

pub fn derive_row(record: &DeviceRecord, identity: &str) -> DeviceRow {
    let status = record.device_status();
    let used_by_me = is_member(&record.users, identity);
    let (use_enabled, leave_enabled) = control_flags(used_by_me, status);
    DeviceRow {
        name: record.name.clone(),
        ip: record.ip.clone(),
        status,
        active_user_count: record.active_user_count,
        used_by_me,
        use_enabled,
        leave_enabled,
    }
}

/// Full replacement of the table body, in input order
pub fn render_table(records: &[DeviceRecord], identity: &str) -> Vec<TableRow> {
    if records.is_empty() {
        return vec![TableRow::Placeholder(String::from(EMPTY_PLACEHOLDER))];
    }
    records
        .iter()
        .map(|r| TableRow::Device(derive_row(r, identity)))
        .collect()
}

/// Row state fixed up from a toggle response until the next snapshot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowOverride {
    pub status: DeviceStatus,
    pub active_user_count: u32,
    pub used_by_me: bool,
    pub use_enabled: bool,
    pub leave_enabled: bool,
}

impl RowOverride {
    /// `current` is the row's status before the call, kept when the
    /// response does not report one
    pub fn from_response(response: &PlugStatus, current: DeviceStatus, identity: &str) -> Self {
        let status = match response.status {
            Some(on) => DeviceStatus::from(Some(on)),
            None => current,
        };
        let used_by_me = is_member(&response.users, identity);
        let (use_enabled, leave_enabled) = control_flags(used_by_me, status);
        RowOverride {
            status,
            active_user_count: response.active_user_count,
            used_by_me,
            use_enabled,
            leave_enabled,
        }
    }

    fn apply(&self, row: &mut DeviceRow) {
        row.status = self.status;
        row.active_user_count = self.active_user_count;
        row.used_by_me = self.used_by_me;
        row.use_enabled = self.use_enabled;
        row.leave_enabled = self.leave_enabled;
    }
}

/// Last snapshot plus transient per-row state
#[derive(Clone, Debug, Default)]
pub struct DeviceBoard {
    records: Vec<DeviceRecord>,
    loaded: bool,
    overrides: HashMap<String, RowOverride>,
    in_flight: HashSet<(String, PlugAction)>,
}

impl DeviceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }

    /// False until the first snapshot arrives
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace everything with an authoritative snapshot
    pub fn apply_snapshot(&mut self, records: Vec<DeviceRecord>) {
        self.records = records;
        self.loaded = true;
        self.overrides.clear();
    }

    /// Mark a control as busy. Returns false when the control is already
    /// busy or currently disabled, in which case nothing should be sent.
    pub fn begin_action(&mut self, name: &str, action: PlugAction, identity: &str) -> bool {
        let enabled = self
            .row(name, identity)
            .map(|row| row.control_enabled(action))
            .unwrap_or(false);
        if !enabled {
            return false;
        }
        self.in_flight.insert((name.to_string(), action))
    }

    /// Reconcile the authoritative toggle result into its row
    pub fn complete_action(
        &mut self,
        name: &str,
        action: PlugAction,
        response: &PlugStatus,
        identity: &str,
    ) {
        self.in_flight.remove(&(name.to_string(), action));
        let current = self
            .row(name, identity)
            .map(|row| row.status)
            .unwrap_or(DeviceStatus::Unknown);
        self.overrides.insert(
            name.to_string(),
            RowOverride::from_response(response, current, identity),
        );
    }

    /// Re-enable the originating control; the row is otherwise untouched
    pub fn fail_action(&mut self, name: &str, action: PlugAction) {
        self.in_flight.remove(&(name.to_string(), action));
    }

    pub fn is_in_flight(&self, name: &str, action: PlugAction) -> bool {
        self.in_flight.contains(&(name.to_string(), action))
    }

    pub fn reset(&mut self) {
        *self = DeviceBoard::default();
    }

    pub fn row(&self, name: &str, identity: &str) -> Option<DeviceRow> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .map(|r| self.decorate(derive_row(r, identity)))
    }

    /// Rows as displayed: snapshot, then overrides, then busy controls
    pub fn rows(&self, identity: &str) -> Vec<TableRow> {
        render_table(&self.records, identity)
            .into_iter()
            .map(|row| match row {
                TableRow::Device(device) => TableRow::Device(self.decorate(device)),
                placeholder => placeholder,
            })
            .collect()
    }

    fn decorate(&self, mut row: DeviceRow) -> DeviceRow {
        if let Some(ov) = self.overrides.get(&row.name) {
            ov.apply(&mut row);
        }
        if self.is_in_flight(&row.name, PlugAction::On) {
            row.use_enabled = false;
        }
        if self.is_in_flight(&row.name, PlugAction::Off) {
            row.leave_enabled = false;
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, status: Option<bool>, users: &[&str]) -> DeviceRecord {
        DeviceRecord {
            name: name.to_string(),
            ip: None,
            status,
            active_user_count: users.len() as u32,
            users: users.iter().map(|u| u.to_string()).collect(),
        }
    }

    fn device(row: &TableRow) -> &DeviceRow {
        match row {
            TableRow::Device(d) => d,
            TableRow::Placeholder(_) => panic!("expected a device row"),
        }
    }

    #[test]
    fn test_empty_list_renders_one_placeholder() {
        let rows = render_table(&[], "alice");
        assert_eq!(rows, vec![TableRow::Placeholder(EMPTY_PLACEHOLDER.to_string())]);
    }

    #[test]
    fn test_unknown_status_disables_both_controls() {
        for users in [&["alice"][..], &[][..], &["bob"][..]] {
            let row = derive_row(&record("fan", None, users), "alice");
            assert_eq!(row.status, DeviceStatus::Unknown);
            assert!(!row.use_enabled);
            assert!(!row.leave_enabled);
        }
    }

    #[test]
    fn test_membership_drives_controls() {
        let mine = derive_row(&record("lamp", Some(true), &["alice"]), "alice");
        assert!(mine.used_by_me);
        assert!(!mine.use_enabled);
        assert!(mine.leave_enabled);

        let not_mine = derive_row(&record("lamp", Some(false), &[]), "alice");
        assert!(!not_mine.used_by_me);
        assert!(not_mine.use_enabled);
        assert!(!not_mine.leave_enabled);
    }

    #[test]
    fn test_whitespace_in_users_is_ignored() {
        let row = derive_row(&record("lamp", Some(true), &[" alice "]), "alice");
        assert!(row.used_by_me);
        let row = derive_row(&record("lamp", Some(true), &["alice"]), " alice\n");
        assert!(row.used_by_me);
    }

    #[test]
    fn test_other_users_do_not_lock_the_plug() {
        let row = derive_row(&record("lamp", Some(true), &["bob"]), "alice");
        assert!(row.use_enabled);
        assert!(!row.leave_enabled);
        assert_eq!(row.active_user_count, 1);
    }

    #[test]
    fn test_rows_keep_input_order() {
        let records = vec![
            record("zeta", Some(true), &[]),
            record("alpha", Some(false), &[]),
        ];
        let names: Vec<_> = render_table(&records, "alice")
            .iter()
            .map(|r| device(r).name.clone())
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_toggle_response_reconciles_row() {
        let mut board = DeviceBoard::new();
        board.apply_snapshot(vec![record("lamp1", Some(false), &[])]);

        assert!(board.begin_action("lamp1", PlugAction::On, "alice"));
        let busy = board.row("lamp1", "alice").unwrap();
        assert!(!busy.use_enabled);

        let response = PlugStatus {
            name: "lamp1".into(),
            status: Some(true),
            active_user_count: 1,
            users: vec!["alice".into()],
        };
        board.complete_action("lamp1", PlugAction::On, &response, "alice");

        let row = board.row("lamp1", "alice").unwrap();
        assert!(!row.use_enabled);
        assert!(row.leave_enabled);
        assert_eq!(row.status, DeviceStatus::On);
        assert_eq!(row.active_user_count, 1);
    }

    #[test]
    fn test_toggle_response_without_status_keeps_row_status() {
        let mut board = DeviceBoard::new();
        board.apply_snapshot(vec![record("lamp1", Some(false), &[])]);
        assert!(board.begin_action("lamp1", PlugAction::On, "alice"));

        let response = PlugStatus {
            name: String::new(),
            status: None,
            active_user_count: 1,
            users: vec!["alice".into()],
        };
        board.complete_action("lamp1", PlugAction::On, &response, "alice");

        let row = board.row("lamp1", "alice").unwrap();
        assert_eq!(row.status, DeviceStatus::Off);
        assert!(row.used_by_me);
        assert!(!row.use_enabled);
        assert!(row.leave_enabled);
    }

    #[test]
    fn test_toggle_response_with_other_user_keeps_use_enabled() {
        let mut board = DeviceBoard::new();
        board.apply_snapshot(vec![record("lamp1", Some(true), &["alice", "bob"])]);
        assert!(board.begin_action("lamp1", PlugAction::Off, "alice"));

        let response = PlugStatus {
            name: "lamp1".into(),
            status: Some(true),
            active_user_count: 1,
            users: vec!["bob".into()],
        };
        board.complete_action("lamp1", PlugAction::Off, &response, "alice");

        let row = board.row("lamp1", "alice").unwrap();
        assert!(row.use_enabled);
        assert!(!row.leave_enabled);
    }

    #[test]
    fn test_duplicate_and_disabled_actions_are_refused() {
        let mut board = DeviceBoard::new();
        board.apply_snapshot(vec![
            record("lamp1", Some(false), &[]),
            record("fan", None, &[]),
        ]);

        assert!(board.begin_action("lamp1", PlugAction::On, "alice"));
        assert!(!board.begin_action("lamp1", PlugAction::On, "alice"));
        // Leave is disabled: not mine
        assert!(!board.begin_action("lamp1", PlugAction::Off, "alice"));
        // Unknown status
        assert!(!board.begin_action("fan", PlugAction::On, "alice"));
        assert!(!board.begin_action("missing", PlugAction::On, "alice"));
    }

    #[test]
    fn test_failure_re_enables_control_only() {
        let mut board = DeviceBoard::new();
        board.apply_snapshot(vec![record("lamp1", Some(false), &[])]);
        let before = board.row("lamp1", "alice").unwrap();

        board.begin_action("lamp1", PlugAction::On, "alice");
        board.fail_action("lamp1", PlugAction::On);

        assert_eq!(board.row("lamp1", "alice").unwrap(), before);
    }

    #[test]
    fn test_snapshot_clears_overrides() {
        let mut board = DeviceBoard::new();
        board.apply_snapshot(vec![record("lamp1", Some(false), &[])]);
        board.begin_action("lamp1", PlugAction::On, "alice");
        board.complete_action(
            "lamp1",
            PlugAction::On,
            &PlugStatus {
                name: "lamp1".into(),
                status: Some(true),
                active_user_count: 1,
                users: vec!["alice".into()],
            },
            "alice",
        );

        // A poll that has not yet seen the change wins
        board.apply_snapshot(vec![record("lamp1", Some(false), &[])]);
        let row = board.row("lamp1", "alice").unwrap();
        assert!(row.use_enabled);
        assert!(!row.leave_enabled);
    }

    #[test]
    fn test_in_flight_survives_snapshot() {
        let mut board = DeviceBoard::new();
        board.apply_snapshot(vec![record("lamp1", Some(false), &[])]);
        board.begin_action("lamp1", PlugAction::On, "alice");
        board.apply_snapshot(vec![record("lamp1", Some(false), &[])]);

        assert!(board.is_in_flight("lamp1", PlugAction::On));
        assert!(!board.row("lamp1", "alice").unwrap().use_enabled);
    }
}
