//! In-process browser
//!
//! Serves pages from a [`Site`] and applies user interactions with browser
//! semantics: number inputs drop non-numeric keystrokes, radios in a group
//! exclude each other, submit buttons submit their form, `target="_blank"`
//! links leave the current page alone. Page timers run on wall-clock time
//! until [`Driver::install_clock`] switches them to simulated time.

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{AttachMode, Driver, ElementId, ElementState, Invocation, OptionChoice};
use crate::clock::Scheduler;
use crate::common::{Error, Result};
use crate::dom::{self, Document, Locator, NodeId};
use crate::fixtures::FixtureFile;
use crate::site::{self, PageContext, PageScript, Site};

struct LoadedPage {
    path: String,
    document: Document,
    scheduler: Scheduler,
    script: Box<dyn PageScript>,
}

impl LoadedPage {
    fn context(&mut self) -> (PageContext<'_>, &mut Box<dyn PageScript>) {
        (
            PageContext {
                document: &mut self.document,
                scheduler: &mut self.scheduler,
            },
            &mut self.script,
        )
    }

    fn fire_change(&mut self, target: NodeId) {
        let (mut ctx, script) = self.context();
        script.on_change(&mut ctx, target);
    }

    fn fire_submit(&mut self, form: NodeId) {
        let (mut ctx, script) = self.context();
        script.on_submit(&mut ctx, form);
    }

    fn settle(&mut self) {
        let ran = self.scheduler.run_due(&mut self.document);
        if ran > 0 {
            trace!(ran, "page timers ran");
        }
    }
}

pub struct SimulatedBrowser {
    site: Site,
    page: Option<LoadedPage>,
    generation: u64,
    /// Simulated time in ms once the clock is installed; carried across page loads
    clock_ms: Option<u64>,
    /// URLs opened in another tab by `target="_blank"` links
    opened_tabs: Vec<String>,
}

impl SimulatedBrowser {
    pub fn new(site: Site) -> Self {
        Self {
            site,
            page: None,
            generation: 0,
            clock_ms: None,
            opened_tabs: Vec::new(),
        }
    }

    pub fn opened_tabs(&self) -> &[String] {
        &self.opened_tabs
    }

    fn page_mut(&mut self, action: &str) -> Result<&mut LoadedPage> {
        self.page
            .as_mut()
            .ok_or_else(|| Error::invalid_state(action, "no page loaded"))
    }

    /// Resolve a handle on the current page, running due timers first
    fn resolve(&mut self, element: ElementId, action: &str) -> Result<(&mut LoadedPage, NodeId)> {
        let generation = self.generation;
        let page = self.page_mut(action)?;
        let node = NodeId::from_index(element.node());
        if element.page() != generation
            || page.document.element(node).is_none()
            || !page.document.is_attached(node)
        {
            return Err(Error::StaleElement(action.to_string()));
        }
        page.settle();
        Ok((page, node))
    }

    fn load(&mut self, url: &str) -> Result<()> {
        let (path, page) = self.site.open(url)?;
        let scheduler = match self.clock_ms {
            Some(now_ms) => Scheduler::simulated_at(now_ms),
            None => Scheduler::real(),
        };
        self.generation += 1;
        debug!(url, path = %path, clock_ms = ?self.clock_ms, "page loaded");
        self.page = Some(LoadedPage {
            path,
            document: page.document,
            scheduler,
            script: page.script,
        });
        Ok(())
    }
}

/// Interactions need the element rendered, like a real user would
fn ensure_visible(doc: &Document, node: NodeId, action: &str) -> Result<()> {
    if doc.is_visible(node) {
        Ok(())
    } else {
        Err(Error::invalid_state(action, "element is not visible"))
    }
}

fn describe(doc: &Document, node: NodeId) -> String {
    match doc.element(node) {
        Some(el) => match el.attr("id") {
            Some(id) => format!("<{}#{}>", el.tag, id),
            None => format!("<{}>", el.tag),
        },
        None => "<node>".to_string(),
    }
}

/// Check `node` and uncheck the other radios of its group
fn check_radio(doc: &mut Document, node: NodeId) {
    let name = doc
        .element(node)
        .and_then(|e| e.attr("name"))
        .map(str::to_string);
    let form = doc.find_ancestor(node, "form");
    if let Some(name) = name {
        for other in doc.elements() {
            let same_group = other != node
                && doc
                    .element(other)
                    .map(|e| e.is("input") && e.input_type() == "radio" && e.attr("name") == Some(name.as_str()))
                    .unwrap_or(false)
                && doc.find_ancestor(other, "form") == form;
            if same_group {
                if let Some(el) = doc.element_mut(other) {
                    el.checked = false;
                }
            }
        }
    }
    if let Some(el) = doc.element_mut(node) {
        el.checked = true;
    }
}

#[async_trait]
impl Driver for SimulatedBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.load(url)
    }

    fn current_url(&self) -> Option<String> {
        self.page.as_ref().map(|p| p.path.clone())
    }

    async fn title(&mut self) -> Result<String> {
        let page = self.page_mut("read the title")?;
        Ok(page.document.title().to_string())
    }

    async fn find(&mut self, locator: &Locator) -> Result<Vec<ElementId>> {
        let generation = self.generation;
        let page = self.page_mut("query elements")?;
        page.settle();
        let found: Vec<ElementId> = locator
            .matches(&page.document)
            .into_iter()
            .map(|n| ElementId::new(generation, n.index()))
            .collect();
        trace!(locator = %locator, count = found.len(), "resolved");
        Ok(found)
    }

    async fn inspect(&mut self, element: ElementId) -> Result<ElementState> {
        let (page, node) = self.resolve(element, "inspect element")?;
        let doc = &page.document;
        let el = doc
            .element(node)
            .ok_or_else(|| Error::Internal("handle does not point at an element".to_string()))?;
        Ok(ElementState {
            tag: el.tag.clone(),
            attributes: el.attrs.clone(),
            value: doc.value(node),
            checked: el.is_checkable().then_some(el.checked),
            visible: doc.is_visible(node),
            text: doc.text_content(node),
            files: el.files.clone(),
        })
    }

    async fn type_char(&mut self, element: ElementId, ch: char) -> Result<()> {
        let (page, node) = self.resolve(element, "type")?;
        ensure_visible(&page.document, node, "type into element")?;
        let target = describe(&page.document, node);
        let el = page
            .document
            .element_mut(node)
            .ok_or_else(|| Error::Internal("handle does not point at an element".to_string()))?;
        if !el.is_text_field() {
            return Err(Error::invalid_state(&format!("type into {}", target), "not a text field"));
        }
        if el.input_type() == "number" && el.is("input") && !dom::is_number_keystroke(ch) {
            trace!(%target, ?ch, "keystroke rejected by number input");
            return Ok(());
        }
        el.raw_value.push(ch);
        Ok(())
    }

    async fn clear(&mut self, element: ElementId) -> Result<()> {
        let (page, node) = self.resolve(element, "clear")?;
        let target = describe(&page.document, node);
        let el = page
            .document
            .element_mut(node)
            .ok_or_else(|| Error::Internal("handle does not point at an element".to_string()))?;
        if !el.is_text_field() {
            return Err(Error::invalid_state(&format!("clear {}", target), "not a text field"));
        }
        el.raw_value.clear();
        Ok(())
    }

    async fn select_option(&mut self, element: ElementId, choice: &OptionChoice) -> Result<String> {
        let (page, node) = self.resolve(element, "select")?;
        ensure_visible(&page.document, node, "select an option")?;
        let target = describe(&page.document, node);
        let doc = &mut page.document;
        if !doc.element(node).map(|e| e.is("select")).unwrap_or(false) {
            return Err(Error::invalid_state(&format!("select from {}", target), "not a <select>"));
        }

        let options = doc.options(node);
        let chosen = match choice {
            OptionChoice::Text(text) => options
                .iter()
                .copied()
                .find(|o| doc.text_content(*o).trim() == text.trim()),
            OptionChoice::Value(value) => options
                .iter()
                .copied()
                .find(|o| doc.option_value(*o) == *value),
            OptionChoice::Index(index) => options.get(*index).copied(),
        };
        let chosen = chosen.ok_or_else(|| Error::option_not_found(&target, choice.to_string()))?;
        if doc.element(chosen).and_then(|e| e.attr("disabled")).is_some() {
            return Err(Error::option_not_found(&target, format!("{} (option is disabled)", choice)));
        }

        for option in options {
            if let Some(el) = doc.element_mut(option) {
                el.selected = option == chosen;
            }
        }
        let value = doc.value(node).unwrap_or_default();
        debug!(%target, %choice, value = %value, "option selected");
        page.fire_change(node);
        Ok(value)
    }

    async fn set_checked(&mut self, element: ElementId, checked: bool) -> Result<()> {
        let (page, node) = self.resolve(element, "check")?;
        ensure_visible(&page.document, node, "check element")?;
        let target = describe(&page.document, node);
        let (is_radio, current) = match page.document.element(node) {
            Some(el) if el.is_checkable() => (el.input_type() == "radio", el.checked),
            _ => {
                return Err(Error::invalid_state(
                    &format!("check {}", target),
                    "not a checkbox or radio",
                ))
            }
        };
        if is_radio && !checked {
            return Err(Error::invalid_state(
                &format!("uncheck {}", target),
                "radios can only be checked",
            ));
        }
        if current == checked {
            trace!(%target, checked, "already in requested state");
            return Ok(());
        }

        if is_radio {
            check_radio(&mut page.document, node);
        } else if let Some(el) = page.document.element_mut(node) {
            el.checked = checked;
        }
        page.fire_change(node);
        Ok(())
    }

    async fn click(&mut self, element: ElementId) -> Result<()> {
        let (page, node) = self.resolve(element, "click")?;
        ensure_visible(&page.document, node, "click element")?;
        let target = describe(&page.document, node);
        let el = page
            .document
            .element(node)
            .cloned()
            .ok_or_else(|| Error::Internal("handle does not point at an element".to_string()))?;
        debug!(%target, "click");

        if el.is("input") && el.input_type() == "checkbox" {
            if let Some(el) = page.document.element_mut(node) {
                el.checked = !el.checked;
            }
            page.fire_change(node);
            return Ok(());
        }
        if el.is("input") && el.input_type() == "radio" {
            if !el.checked {
                check_radio(&mut page.document, node);
                page.fire_change(node);
            }
            return Ok(());
        }

        let submits = (el.is("button") && el.attr("type").map(|t| t.eq_ignore_ascii_case("submit")).unwrap_or(true))
            || (el.is("input") && el.input_type() == "submit");
        if submits {
            if let Some(form) = page.document.find_ancestor(node, "form") {
                page.fire_submit(form);
            }
            return Ok(());
        }

        if el.is("a") {
            if let Some(href) = el.attr("href") {
                let url = site::join(&page.path, href);
                if el.attr("target") == Some("_blank") {
                    debug!(url = %url, "link opened in a new tab");
                    self.opened_tabs.push(url);
                    return Ok(());
                }
                return self.load(&url);
            }
        }
        Ok(())
    }

    async fn attach_file(&mut self, element: ElementId, file: &FixtureFile, mode: AttachMode) -> Result<()> {
        let (page, node) = self.resolve(element, "select a file")?;
        let target = describe(&page.document, node);
        let el = page
            .document
            .element_mut(node)
            .ok_or_else(|| Error::Internal("handle does not point at an element".to_string()))?;
        if !(el.is("input") && el.input_type() == "file") {
            return Err(Error::invalid_state(
                &format!("attach a file to {}", target),
                "not a file input",
            ));
        }
        el.files = vec![file.name.clone()];
        debug!(%target, file = %file.name, ?mode, bytes = file.contents.len(), "file attached");
        page.fire_change(node);
        Ok(())
    }

    async fn invoke(&mut self, element: ElementId, invocation: &Invocation) -> Result<()> {
        let (page, node) = self.resolve(element, "invoke")?;
        match invocation {
            Invocation::Text(text) => page.document.set_text_content(node, text),
            other => {
                let el = page
                    .document
                    .element_mut(node)
                    .ok_or_else(|| Error::Internal("handle does not point at an element".to_string()))?;
                match other {
                    Invocation::Show => el.set_hidden(false),
                    Invocation::Hide => el.set_hidden(true),
                    Invocation::RemoveAttr(name) => {
                        el.attrs.remove(&name.to_ascii_lowercase());
                    }
                    Invocation::Attr { name, value } => {
                        el.attrs.insert(name.to_ascii_lowercase(), value.clone());
                    }
                    Invocation::Val(value) => el.raw_value = value.clone(),
                    Invocation::Text(_) => {}
                }
            }
        }
        trace!(?invocation, "invoked");
        Ok(())
    }

    async fn install_clock(&mut self) -> Result<()> {
        if self.clock_ms.is_some() {
            return Ok(());
        }
        if let Some(page) = self.page.as_mut() {
            page.scheduler.install_simulated()?;
        }
        self.clock_ms = Some(0);
        debug!("simulated clock installed");
        Ok(())
    }

    async fn tick(&mut self, ms: u64) -> Result<usize> {
        let Some(now_ms) = self.clock_ms else {
            return Err(Error::ClockNotInstalled);
        };
        let (ran, now_ms) = match self.page.as_mut() {
            Some(page) => {
                let ran = page.scheduler.advance(ms, &mut page.document)?;
                (ran, page.scheduler.now_ms())
            }
            None => (0, now_ms.saturating_add(ms)),
        };
        self.clock_ms = Some(now_ms);
        debug!(ms, ran, now_ms, "clock ticked");
        Ok(ran)
    }

    async fn close(&mut self) -> Result<()> {
        self.page = None;
        self.clock_ms = None;
        self.opened_tabs.clear();
        self.generation += 1;
        Ok(())
    }
}
