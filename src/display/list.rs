//! List adapter over a `ScanSnapshot`.
use std::fmt;

use serde::Serialize;

use crate::display::snapshot::ScanSnapshot;
use crate::errors::QrLensResult;
use crate::executor::launcher::UrlLauncher;
use crate::executor::safety::is_openable;
use crate::perception::types::ValueKind;

/// One bound row of the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub position: usize,
    pub text: String,
    pub kind: ValueKind,
    pub openable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScanList {
    snapshot: ScanSnapshot,
}

impl ScanList {
    pub fn new(snapshot: ScanSnapshot) -> Self {
        Self { snapshot }
    }

    /// Swap in a newer snapshot.
    pub fn submit(&mut self, snapshot: ScanSnapshot) {
        self.snapshot = snapshot;
    }

    pub fn item_count(&self) -> usize {
        self.snapshot.len()
    }

    pub fn bind(&self, position: usize) -> Option<ListItem> {
        self.snapshot.get(position).map(|entry| ListItem {
            position,
            text: entry.value.clone(),
            kind: entry.kind,
            openable: entry.kind == ValueKind::Url && is_openable(&entry.value),
        })
    }

    pub fn items(&self) -> Vec<ListItem> {
        (0..self.item_count()).filter_map(|i| self.bind(i)).collect()
    }

    /// Open the item at `position` if it is a web URL. Returns `Ok(false)`
    /// when there is no such item or the value is plain text.
    pub async fn activate(
        &self,
        position: usize,
        launcher: &dyn UrlLauncher,
    ) -> QrLensResult<bool> {
        let Some(item) = self.bind(position) else {
            tracing::debug!(position, "activate: no item at position");
            return Ok(false);
        };
        if !item.openable {
            tracing::debug!(position, "activate: value is not a URL");
            return Ok(false);
        }
        launcher.open(&item.text).await?;
        tracing::info!(position, url = %item.text, "opened scanned URL");
        Ok(true)
    }
}

/// One line per item; openable rows are marked with `->`.
pub fn render_items(items: &[ListItem]) -> String {
    if items.is_empty() {
        return "(no codes scanned yet)\n".into();
    }
    items
        .iter()
        .map(|item| {
            let marker = if item.openable { "->" } else { "  " };
            format!("{:>3} {} {}\n", item.position, marker, item.text)
        })
        .collect()
}

impl fmt::Display for ScanList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_items(&self.items()))
    }
}
