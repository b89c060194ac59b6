//! State of the repository sheet, the page that shows a single repository and lets the user edit
//! its address, fingerprint and credentials.
//!
//! The sheet owns the text of all input fields together with their validation flags. Flags are
//! recomputed on every change, and saving is only possible while all of them are valid.

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    models::RepositoryRecord,
    sync::SyncBinder,
    text,
    validate::{self, RepoForm, Validation},
};

pub struct RepoSheet {
    id: u64,
    record: Option<RepositoryRecord>,
    app_count: u64,
    edit_mode: bool,
    form: RepoForm,
    validation: Validation,
}

impl RepoSheet {
    /// Open the sheet for a repository. In edit mode, an empty address is prefilled from the
    /// clipboard content if it holds a repository link.
    pub fn open(
        id: u64,
        record: Option<RepositoryRecord>,
        app_count: u64,
        edit_mode: bool,
        clipboard: Option<&str>,
    ) -> Self {
        let mut sheet = Self {
            id,
            form: form_of(record.as_ref()),
            record,
            app_count,
            edit_mode: false,
            validation: Validation::default(),
        };

        if edit_mode {
            sheet.edit(clipboard);
        } else {
            sheet.revalidate();
        }

        sheet
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub const fn form(&self) -> &RepoForm {
        &self.form
    }

    pub const fn validation(&self) -> Validation {
        self.validation
    }

    /// Saving is always possible outside of edit mode (it switches into edit mode), otherwise
    /// only with all fields valid.
    pub const fn can_save(&self) -> bool {
        !self.edit_mode || self.validation.is_valid()
    }

    /// A new version of the repository was observed. All fields reset to its values.
    pub fn refresh(&mut self, record: Option<RepositoryRecord>) {
        self.form = form_of(record.as_ref());
        self.record = record;
        self.revalidate();
    }

    pub fn set_app_count(&mut self, count: u64) {
        self.app_count = count;
    }

    pub fn edit(&mut self, clipboard: Option<&str>) {
        self.edit_mode = true;

        let address_empty = self.record.as_ref().is_none_or(|r| r.address.is_empty());
        let prefill = clipboard
            .filter(|_| address_empty)
            .and_then(validate::prefill);

        if let Some(prefill) = prefill {
            debug!(address = %prefill.address, "prefilled from clipboard");

            self.form.address = prefill.address;
            if let Some(fingerprint) = prefill.fingerprint {
                self.form.fingerprint = fingerprint;
            }
        }

        self.revalidate();
    }

    /// Leave edit mode, discarding all changes.
    pub fn cancel(&mut self) {
        self.edit_mode = false;
        self.form = form_of(self.record.as_ref());
        self.revalidate();
    }

    pub fn set_address(&mut self, address: String) {
        self.form.address = address;
        self.validation.address = validate::normalize_address(&self.form.address).is_some();
    }

    pub fn set_fingerprint(&mut self, fingerprint: String) {
        self.form.fingerprint = fingerprint;
        self.validation.fingerprint = validate::fingerprint(&self.form.fingerprint);
    }

    pub fn set_username(&mut self, username: String) {
        self.form.username = username;
        self.revalidate_authentication();
    }

    pub fn set_password(&mut self, password: String) {
        self.form.password = password;
        self.revalidate_authentication();
    }

    /// Apply all fields at once, as submitted by a client.
    pub fn set_form(&mut self, form: RepoForm) {
        self.form = form;
        self.revalidate();
    }

    /// Use one of the repository's mirrors as address. Returns `false` if there is no mirror at
    /// that position.
    pub fn select_mirror(&mut self, index: usize) -> bool {
        let Some(mirror) = self
            .record
            .as_ref()
            .and_then(|r| r.mirrors.get(index))
            .cloned()
        else {
            return false;
        };

        self.set_address(mirror);
        true
    }

    /// Write the edited fields back into the repository and hand it to `update_repo`, then leave
    /// edit mode. Does nothing and returns `false` while any field is invalid or outside of edit
    /// mode.
    ///
    /// The address is stored in its normalized form and the fingerprint in uppercase.
    pub fn save(&mut self, update_repo: impl FnOnce(Option<RepositoryRecord>)) -> bool {
        if !self.edit_mode || !self.validation.is_valid() {
            return false;
        }

        let form = &self.form;
        let updated = self.record.clone().map(|mut record| {
            record.address =
                validate::normalize_address(&form.address).unwrap_or_else(|| form.address.clone());
            record.fingerprint = form.fingerprint.to_uppercase();
            record.set_authentication(&form.username, &form.password);
            record
        });

        update_repo(updated);
        self.edit_mode = false;

        true
    }

    /// Delete the repository through the sync service and call `on_dismiss` once that finished,
    /// whether it succeeded or not.
    pub async fn delete<B: SyncBinder>(&self, binder: &B, on_dismiss: impl FnOnce()) {
        match binder.delete_repository(self.id).await {
            Ok(deleted) => debug!(id = self.id, deleted, "repository delete finished"),
            Err(e) => warn!(id = self.id, error = ?e, "failed deleting repository"),
        }

        on_dismiss();
    }

    pub fn view(&self) -> SheetView {
        let record = self.record.as_ref();
        let synced = record.is_some_and(RepositoryRecord::synced);
        let show_details = synced && !self.edit_mode;

        let show_app_count = !self.edit_mode
            && record.is_some_and(|r| {
                r.enabled && (!r.last_modified.is_empty() || !r.entity_tag.is_empty())
            });

        let unsigned = synced && record.is_some_and(|r| r.fingerprint.is_empty());

        SheetView {
            id: self.id,
            edit_mode: self.edit_mode,
            name: record.filter(|_| show_details).map(|r| r.name.clone()),
            description: record
                .filter(|_| !self.edit_mode)
                .map(|r| r.description.replace('\n', " ")),
            updated: record.filter(|_| show_details).map(|r| r.updated),
            app_count: show_app_count.then_some(self.app_count),
            address: record.map(|r| r.address.clone()).unwrap_or_default(),
            mirrors: record.map(|r| r.mirrors.clone()).unwrap_or_default(),
            enabled: record.is_some_and(|r| r.enabled),
            fingerprint: record
                .filter(|_| !unsigned)
                .map(|r| text::format_fingerprint(&r.fingerprint)),
            unsigned,
            username: record
                .and_then(RepositoryRecord::authentication_pair)
                .map(|(username, _)| username),
            form: self.edit_mode.then(|| FormView {
                address: self.form.address.clone(),
                fingerprint: self.form.fingerprint.clone(),
                username: self.form.username.clone(),
                validation: self.validation,
                can_save: self.can_save(),
            }),
        }
    }

    fn revalidate(&mut self) {
        self.validation = Validation::check(&self.form);
    }

    fn revalidate_authentication(&mut self) {
        let valid = validate::authentication(&self.form.username, &self.form.password);
        self.validation.username = valid;
        self.validation.password = valid;
    }
}

fn form_of(record: Option<&RepositoryRecord>) -> RepoForm {
    let Some(record) = record else {
        return RepoForm::default();
    };
    let (username, password) = record.authentication_pair().unwrap_or_default();

    RepoForm {
        address: record.address.clone(),
        fingerprint: record.fingerprint.clone(),
        username,
        password,
    }
}

/// Read-only projection of the sheet, only carrying what is meant to be shown.
#[derive(Debug, Serialize)]
pub struct SheetView {
    pub id: u64,
    pub edit_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_count: Option<u64>,
    pub address: String,
    pub mirrors: Vec<String>,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub unsigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FormView>,
}

/// Field contents of the sheet while in edit mode. The password is never echoed back.
#[derive(Debug, Serialize)]
pub struct FormView {
    pub address: String,
    pub fingerprint: String,
    pub username: String,
    pub validation: Validation,
    pub can_save: bool,
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use anyhow::anyhow;

    use super::*;

    const FINGERPRINT: &str = "43238d512c1e5eb2d6569f4a3afbf5523418b82e0a3ed1552770abb9a9c9ccab";

    fn record() -> RepositoryRecord {
        let mut record = RepositoryRecord {
            id: 7,
            address: "https://example.com/repo".to_owned(),
            mirrors: vec![
                "https://mirror.example.com/repo".to_owned(),
                "mirror without scheme".to_owned(),
            ],
            name: "Example".to_owned(),
            description: "First line\nsecond line".to_owned(),
            enabled: true,
            fingerprint: FINGERPRINT.to_uppercase(),
            entity_tag: "\"abc\"".to_owned(),
            updated: 1_700_000_000_000,
            ..RepositoryRecord::default()
        };
        record.set_authentication("user", "secret");
        record
    }

    struct FakeBinder {
        calls: Mutex<Vec<u64>>,
        fail: bool,
    }

    impl FakeBinder {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl SyncBinder for FakeBinder {
        async fn delete_repository(&self, id: u64) -> anyhow::Result<bool> {
            self.calls.lock().unwrap().push(id);
            if self.fail {
                Err(anyhow!("sync service gone"))
            } else {
                Ok(true)
            }
        }
    }

    #[test]
    fn open_fills_fields() {
        let sheet = RepoSheet::open(7, Some(record()), 12, false, None);

        assert!(!sheet.edit_mode());
        assert!(sheet.can_save());
        assert_eq!("https://example.com/repo", sheet.form().address);
        assert_eq!("user", sheet.form().username);
        assert_eq!("secret", sheet.form().password);
        assert!(sheet.validation().is_valid());
    }

    #[test]
    fn prefill_only_without_address() {
        let link = format!("fdroidrepos://new.example/repo?fingerprint={FINGERPRINT}");

        let sheet = RepoSheet::open(7, Some(record()), 0, true, Some(&link));
        assert_eq!("https://example.com/repo", sheet.form().address);

        let empty = RepositoryRecord {
            id: 8,
            ..RepositoryRecord::default()
        };
        let sheet = RepoSheet::open(8, Some(empty), 0, true, Some(&link));
        assert_eq!("https://new.example/repo", sheet.form().address);
        assert_eq!(FINGERPRINT.to_uppercase(), sheet.form().fingerprint);
        assert!(sheet.validation().is_valid());
    }

    #[test]
    fn prefill_ignores_garbage() {
        let sheet = RepoSheet::open(1, None, 0, true, Some("just some text"));

        assert!(sheet.edit_mode());
        assert_eq!("", sheet.form().address);
        assert!(!sheet.validation().address);
        assert!(!sheet.can_save());
    }

    #[test]
    fn field_changes_revalidate() {
        let mut sheet = RepoSheet::open(7, Some(record()), 0, true, None);
        assert!(sheet.can_save());

        sheet.set_address("nope".to_owned());
        assert!(!sheet.validation().address);
        sheet.set_address("https://other.example/repo/".to_owned());
        assert!(sheet.validation().address);

        sheet.set_fingerprint("ABC".to_owned());
        assert!(!sheet.validation().fingerprint);
        sheet.set_fingerprint(String::new());
        assert!(sheet.validation().fingerprint);

        sheet.set_password(String::new());
        assert!(!sheet.validation().username);
        assert!(!sheet.validation().password);
        sheet.set_username(String::new());
        assert!(sheet.validation().username);
        assert!(sheet.validation().password);

        sheet.set_username("a:b".to_owned());
        sheet.set_password("x".to_owned());
        assert!(!sheet.can_save());
    }

    #[test]
    fn cancel_restores_record() {
        let mut sheet = RepoSheet::open(7, Some(record()), 0, true, None);
        sheet.set_address("nope".to_owned());
        sheet.set_username(String::new());

        sheet.cancel();

        assert!(!sheet.edit_mode());
        assert_eq!("https://example.com/repo", sheet.form().address);
        assert_eq!("user", sheet.form().username);
        assert!(sheet.validation().is_valid());
    }

    #[test]
    fn mirror_selection() {
        let mut sheet = RepoSheet::open(7, Some(record()), 0, true, None);

        assert!(sheet.select_mirror(0));
        assert_eq!("https://mirror.example.com/repo", sheet.form().address);
        assert!(sheet.validation().address);

        assert!(sheet.select_mirror(1));
        assert!(!sheet.validation().address);

        assert!(!sheet.select_mirror(2));
    }

    #[test]
    fn save_normalizes() {
        let mut sheet = RepoSheet::open(7, Some(record()), 0, true, None);
        sheet.set_address("https://Other.example/repo/index-v1.jar".to_owned());
        sheet.set_fingerprint(FINGERPRINT.to_owned());
        sheet.set_username("admin".to_owned());
        sheet.set_password("hunter2".to_owned());

        let mut saved = None;
        assert!(sheet.save(|record| saved = record));

        let saved = saved.unwrap();
        assert_eq!("https://other.example/repo", saved.address);
        assert_eq!(FINGERPRINT.to_uppercase(), saved.fingerprint);
        assert_eq!(
            Some(("admin".to_owned(), "hunter2".to_owned())),
            saved.authentication_pair()
        );
        assert!(!sheet.edit_mode());
    }

    #[test]
    fn save_clears_credentials() {
        let mut sheet = RepoSheet::open(7, Some(record()), 0, true, None);
        sheet.set_username(String::new());
        sheet.set_password(String::new());

        let mut saved = None;
        assert!(sheet.save(|record| saved = record));
        assert_eq!("", saved.unwrap().authentication);
    }

    #[test]
    fn save_refused_when_invalid() {
        let mut sheet = RepoSheet::open(7, Some(record()), 0, true, None);
        sheet.set_fingerprint("123".to_owned());

        let mut called = false;
        assert!(!sheet.save(|_| called = true));
        assert!(!called);
        assert!(sheet.edit_mode());

        let mut sheet = RepoSheet::open(7, Some(record()), 0, false, None);
        assert!(!sheet.save(|_| called = true));
        assert!(!called);
    }

    #[test]
    fn save_without_record() {
        let mut sheet = RepoSheet::open(3, None, 0, true, None);
        sheet.set_address("https://example.com/repo".to_owned());

        let mut calls = 0;
        let mut saved = Some(RepositoryRecord::default());
        assert!(sheet.save(|record| {
            calls += 1;
            saved = record;
        }));
        assert_eq!(1, calls);
        assert_eq!(None, saved);
    }

    #[tokio::test]
    async fn delete_dismisses_after_call() {
        let binder = FakeBinder::new(false);
        let sheet = RepoSheet::open(7, Some(record()), 0, false, None);

        let dismissed = AtomicUsize::new(0);
        sheet
            .delete(&binder, || {
                assert_eq!(vec![7], *binder.calls.lock().unwrap());
                dismissed.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(1, dismissed.load(Ordering::SeqCst));
        assert_eq!(vec![7], *binder.calls.lock().unwrap());
    }

    #[tokio::test]
    async fn delete_dismisses_on_failure() {
        let binder = FakeBinder::new(true);
        let sheet = RepoSheet::open(7, Some(record()), 0, false, None);

        let mut dismissed = false;
        sheet.delete(&binder, || dismissed = true).await;

        assert!(dismissed);
        assert_eq!(1, binder.calls.lock().unwrap().len());
    }

    #[test]
    fn view_of_synced_repo() {
        let sheet = RepoSheet::open(7, Some(record()), 12, false, None);
        let view = sheet.view();

        assert_eq!(Some("Example"), view.name.as_deref());
        assert_eq!(Some("First line second line"), view.description.as_deref());
        assert_eq!(Some(1_700_000_000_000), view.updated);
        assert_eq!(Some(12), view.app_count);
        assert!(!view.unsigned);
        assert!(view.fingerprint.unwrap().starts_with("43 23 8D 51"));
        assert_eq!(Some("user"), view.username.as_deref());
        assert!(view.form.is_none());
    }

    #[test]
    fn view_of_unsigned_repo() {
        let sheet = RepoSheet::open(
            7,
            Some(RepositoryRecord {
                fingerprint: String::new(),
                entity_tag: String::new(),
                ..record()
            }),
            12,
            false,
            None,
        );
        let view = sheet.view();

        assert!(view.unsigned);
        assert_eq!(None, view.fingerprint);
        assert_eq!(None, view.app_count);
    }

    #[test]
    fn view_in_edit_mode() {
        let mut sheet = RepoSheet::open(7, Some(record()), 12, true, None);
        sheet.set_fingerprint("short".to_owned());
        let view = sheet.view();

        assert_eq!(None, view.name);
        assert_eq!(None, view.description);
        assert_eq!(None, view.app_count);

        let form = view.form.unwrap();
        assert_eq!("short", form.fingerprint);
        assert!(!form.validation.fingerprint);
        assert!(!form.can_save);
    }

    #[test]
    fn refresh_resets_fields() {
        let mut sheet = RepoSheet::open(7, Some(record()), 0, true, None);
        sheet.set_address("nope".to_owned());

        let mut changed = record();
        changed.address = "https://moved.example/repo".to_owned();
        sheet.refresh(Some(changed));

        assert!(sheet.edit_mode());
        assert_eq!("https://moved.example/repo", sheet.form().address);
        assert!(sheet.validation().address);
    }
}
