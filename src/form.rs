//! The page's form: named fields, submit listeners, and submission snapshots.
//!
//! A [`Form`] is shared by reference between whoever edits it (the CLI,
//! tests) and the listeners registered with [`Form::on_submit`]. Listeners
//! never see the live field list; they take a [`FormData`] snapshot.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::events::{SubmitEvent, SubmitListener};

/// The value held by one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    File { file_name: String, bytes: Vec<u8> },
}

/// One named entry of a form or payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormEntry {
    pub name: String,
    pub value: FieldValue,
}

/// An owned snapshot of a form's fields, taken at submit time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<FormEntry>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text entry (builder style, handy in tests).
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.entries.push(FormEntry {
            name: name.to_string(),
            value: FieldValue::Text(value.to_string()),
        });
        self
    }

    /// Value of the first text entry with this name.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.entries.iter().find_map(|e| match &e.value {
            FieldValue::Text(v) if e.name == name => Some(v.as_str()),
            _ => None,
        })
    }

    /// The first entry with this name, text or file.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.value)
    }

    pub fn entries(&self) -> &[FormEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for FormData {
    type Item = FormEntry;
    type IntoIter = std::vec::IntoIter<FormEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A form on the page. Field order is insertion order.
pub struct Form {
    id: String,
    fields: Mutex<Vec<FormEntry>>,
    listeners: Mutex<Vec<Arc<dyn SubmitListener>>>,
}

impl Form {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            fields: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set a text field, replacing any existing field of the same name.
    pub fn set_text(&self, name: &str, value: &str) {
        self.upsert(name, FieldValue::Text(value.to_string()));
    }

    /// Attach in-memory file contents under `name`.
    pub fn attach_file(&self, name: &str, file_name: &str, bytes: Vec<u8>) {
        self.upsert(
            name,
            FieldValue::File {
                file_name: file_name.to_string(),
                bytes,
            },
        );
    }

    /// Read a file from disk and attach it under `name`, keeping only its
    /// base name as the uploaded file name.
    pub fn attach_path(&self, name: &str, path: &Path) -> Result<()> {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        self.attach_file(name, &file_name, bytes);
        Ok(())
    }

    pub fn remove(&self, name: &str) {
        self.fields.lock().unwrap().retain(|e| e.name != name);
    }

    pub fn clear(&self) {
        self.fields.lock().unwrap().clear();
    }

    /// Copy the current fields. Later edits to the form do not reach it.
    pub fn snapshot(&self) -> FormData {
        FormData {
            entries: self.fields.lock().unwrap().clone(),
        }
    }

    /// Register a listener to run on every submit, after those already
    /// registered.
    pub fn on_submit(&self, listener: Arc<dyn SubmitListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    /// Fire a submit interaction: build the event, deliver it to every
    /// listener in registration order, and hand it back to the caller.
    pub fn submit(&self) -> SubmitEvent<'_> {
        let event = SubmitEvent::new(self);
        // Clone the list so a listener may register another without deadlocking.
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_submit(&event);
        }
        event
    }

    fn upsert(&self, name: &str, value: FieldValue) {
        let mut fields = self.fields.lock().unwrap();
        match fields.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.value = value,
            None => fields.push(FormEntry {
                name: name.to_string(),
                value,
            }),
        }
    }
}
