//! Pages served to the simulated browser
//!
//! A [`Site`] maps paths to page builders. Each page is a fresh
//! [`Document`] plus the [`PageScript`] that reacts to form events. Scripts
//! schedule deferred work through the page's [`Scheduler`] so a simulated
//! clock can take over their timers.

pub mod cac_tat;
pub mod privacy;

use std::collections::BTreeMap;

use crate::clock::Scheduler;
use crate::common::{Error, Result};
use crate::dom::{Document, NodeId};

/// What a page script can touch while handling an event
pub struct PageContext<'a> {
    pub document: &'a mut Document,
    pub scheduler: &'a mut Scheduler,
}

/// Event handlers of a page
pub trait PageScript: Send {
    /// A form control's value or checked state changed
    fn on_change(&mut self, _ctx: &mut PageContext<'_>, _target: NodeId) {}

    /// A form was submitted
    fn on_submit(&mut self, _ctx: &mut PageContext<'_>, _form: NodeId) {}
}

/// Script for static pages
pub struct NoScript;

impl PageScript for NoScript {}

pub struct Page {
    pub document: Document,
    pub script: Box<dyn PageScript>,
}

type PageBuilder = fn() -> Page;

/// Routing table of the site under test
#[derive(Clone)]
pub struct Site {
    base_url: String,
    routes: BTreeMap<String, PageBuilder>,
}

impl Site {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            routes: BTreeMap::new(),
        }
    }

    /// The contact form and its privacy page
    pub fn cac_tat(base_url: &str) -> Self {
        Self::new(base_url)
            .route(cac_tat::PATH, cac_tat::page)
            .route(privacy::PATH, privacy::page)
    }

    pub fn route(mut self, path: &str, builder: PageBuilder) -> Self {
        self.routes.insert(normalize(path), builder);
        self
    }

    /// Site-relative path for `url`, or `None` when it points elsewhere
    pub fn path_for(&self, url: &str) -> Option<String> {
        let url = url.trim();
        let rest = match url.strip_prefix(self.base_url.as_str()) {
            Some(rest) => rest,
            None if url.contains("://") => return None,
            None => url,
        };
        Some(normalize(rest))
    }

    /// Build a fresh page for `url`
    pub fn open(&self, url: &str) -> Result<(String, Page)> {
        let path = self
            .path_for(url)
            .ok_or_else(|| Error::navigation(url, "outside the site under test"))?;
        let builder = self
            .routes
            .get(&path)
            .ok_or_else(|| Error::navigation(url, format!("no page at '{}' (404)", path)))?;
        Ok((path, builder()))
    }
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("base_url", &self.base_url)
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Resolve a link `href` against the page path it appears on
pub fn join(current: &str, href: &str) -> String {
    if href.contains("://") {
        return href.to_string();
    }
    if let Some(absolute) = href.strip_prefix('/') {
        return normalize(absolute);
    }
    let dir = match current.rfind('/') {
        Some(i) => &current[..=i],
        None => "",
    };
    normalize(&format!("{}{}", dir, href))
}

/// Drop query, fragment, leading `/` and `./`, and collapse `..`
fn normalize(path: &str) -> String {
    let path = path.split(&['?', '#'][..]).next().unwrap_or("");
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
