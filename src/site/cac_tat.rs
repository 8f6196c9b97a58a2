//! The "Central de Atendimento ao Cliente TAT" contact form
//!
//! Submitting shows either the success or the error banner, never both,
//! and hides it again [`BANNER_TIMEOUT_MS`] later. Checking
//! `#phone-checkbox` makes `#phone` required.

use tracing::debug;

use super::{Page, PageContext, PageScript};
use crate::dom::{Document, NodeId};

pub const PATH: &str = "src/index.html";
pub const TITLE: &str = "Central de Atendimento ao Cliente TAT";

/// How long a feedback banner stays visible
pub const BANNER_TIMEOUT_MS: u64 = 3_000;

pub fn page() -> Page {
    Page {
        document: document(),
        script: Box::new(ContactForm),
    }
}

fn document() -> Document {
    let mut doc = Document::new(TITLE);
    let body = doc.body();

    let cat = doc.append_element(body, "span", &[("id", "cat"), ("style", "display: none")]);
    doc.append_text(cat, "🐈");
    let title = doc.append_element(body, "h1", &[("id", "title")]);
    doc.append_text(title, "CAC TAT");
    let subtitle = doc.append_element(body, "p", &[("id", "subtitle")]);
    doc.append_text(subtitle, "Forneça o máximo de informações, por favor.");

    let form = doc.append_element(body, "form", &[]);
    labeled_input(&mut doc, form, "Nome", &[("id", "firstName"), ("name", "first-name"), ("type", "text"), ("required", "")]);
    labeled_input(&mut doc, form, "Sobrenome", &[("id", "lastName"), ("name", "last-name"), ("type", "text"), ("required", "")]);
    labeled_input(&mut doc, form, "E-mail", &[("id", "email"), ("name", "email"), ("type", "email"), ("required", "")]);

    let phone_label = doc.append_element(form, "label", &[("for", "phone")]);
    doc.append_text(phone_label, "Telefone");
    let mark = doc.append_element(
        phone_label,
        "span",
        &[("class", "phone-label-required-mark"), ("style", "display: none")],
    );
    doc.append_text(mark, " (obrigatório)");
    doc.append_element(form, "input", &[("id", "phone"), ("name", "phone"), ("type", "number")]);

    let product = doc.append_element(form, "select", &[("id", "product")]);
    let placeholder = doc.append_element(product, "option", &[("value", ""), ("disabled", ""), ("selected", "")]);
    doc.append_text(placeholder, "Selecione");
    for (value, text) in [
        ("blog", "Blog"),
        ("cursos", "Cursos"),
        ("mentoria", "Mentoria"),
        ("youtube", "YouTube"),
    ] {
        let option = doc.append_element(product, "option", &[("value", value)]);
        doc.append_text(option, text);
    }

    let support = doc.append_element(form, "div", &[("id", "support-type")]);
    for (value, text, checked) in [("ajuda", "Ajuda", true), ("elogio", "Elogio", false), ("feedback", "Feedback", false)] {
        let label = doc.append_element(support, "label", &[]);
        let mut attrs = vec![("type", "radio"), ("name", "atendimento-tat"), ("value", value)];
        if checked {
            attrs.push(("checked", ""));
        }
        doc.append_element(label, "input", &attrs);
        doc.append_text(label, text);
    }

    let contact = doc.append_element(form, "div", &[("id", "check")]);
    for (id, value, text) in [("email-checkbox", "email", "E-mail"), ("phone-checkbox", "phone", "Telefone")] {
        let label = doc.append_element(contact, "label", &[]);
        doc.append_element(label, "input", &[("type", "checkbox"), ("name", id), ("id", id), ("value", value)]);
        doc.append_text(label, text);
    }

    labeled_textarea(&mut doc, form);
    doc.append_element(form, "input", &[("type", "file"), ("id", "file-upload")]);
    let submit = doc.append_element(form, "button", &[("type", "submit"), ("class", "button")]);
    doc.append_text(submit, "Enviar");

    let success = doc.append_element(body, "span", &[("class", "success"), ("style", "display: none")]);
    let strong = doc.append_element(success, "strong", &[]);
    doc.append_text(strong, "Mensagem enviada com sucesso.");
    let error = doc.append_element(body, "span", &[("class", "error"), ("style", "display: none")]);
    let strong = doc.append_element(error, "strong", &[]);
    doc.append_text(strong, "Valide os campos obrigatórios!");

    let privacy = doc.append_element(body, "p", &[("id", "privacy")]);
    let link = doc.append_element(privacy, "a", &[("href", "privacy.html"), ("target", "_blank")]);
    doc.append_text(link, "Política de Privacidade");

    doc
}

fn labeled_input(doc: &mut Document, form: NodeId, label: &str, attrs: &[(&str, &str)]) {
    let for_id = attrs.iter().find(|(k, _)| *k == "id").map(|(_, v)| *v).unwrap_or("");
    let node = doc.append_element(form, "label", &[("for", for_id)]);
    doc.append_text(node, label);
    doc.append_element(form, "input", attrs);
}

fn labeled_textarea(doc: &mut Document, form: NodeId) {
    let label = doc.append_element(form, "label", &[("for", "open-text-area")]);
    doc.append_text(label, "Como podemos te ajudar?");
    doc.append_element(
        form,
        "textarea",
        &[("id", "open-text-area"), ("name", "open-text-area"), ("required", "")],
    );
}

struct ContactForm;

impl PageScript for ContactForm {
    fn on_change(&mut self, ctx: &mut PageContext<'_>, target: NodeId) {
        let doc = &mut *ctx.document;
        let is_phone_checkbox = doc.element(target).and_then(|e| e.attr("id")) == Some("phone-checkbox");
        if !is_phone_checkbox {
            return;
        }
        let required = doc.element(target).map(|e| e.checked).unwrap_or(false);

        if let Some(phone) = doc.get_element_by_id("phone") {
            if let Some(el) = doc.element_mut(phone) {
                if required {
                    el.attrs.insert("required".to_string(), String::new());
                } else {
                    el.attrs.remove("required");
                }
            }
        }
        for mark in doc.get_elements_by_class("phone-label-required-mark") {
            if let Some(el) = doc.element_mut(mark) {
                el.set_hidden(!required);
            }
        }
        debug!(required, "phone requirement changed");
    }

    fn on_submit(&mut self, ctx: &mut PageContext<'_>, form: NodeId) {
        let valid = form_is_valid(ctx.document, form);
        let (shown, other) = if valid {
            ("success", "error")
        } else {
            ("error", "success")
        };
        debug!(valid, "form submitted");

        set_banner(ctx.document, other, false);
        set_banner(ctx.document, shown, true);
        ctx.scheduler.set_timeout(
            BANNER_TIMEOUT_MS,
            Box::new(move |doc: &mut Document| set_banner(doc, shown, false)),
        );
    }
}

fn set_banner(doc: &mut Document, class: &str, visible: bool) {
    for banner in doc.get_elements_by_class(class) {
        if let Some(el) = doc.element_mut(banner) {
            el.set_hidden(!visible);
        }
    }
}

/// Every `required` control is filled and every email field is well formed
fn form_is_valid(doc: &Document, form: NodeId) -> bool {
    doc.elements()
        .into_iter()
        .filter(|id| doc.find_ancestor(*id, "form") == Some(form))
        .all(|id| {
            let Some(element) = doc.element(id) else {
                return true;
            };
            let value = doc.value(id).unwrap_or_default();
            if element.attr("required").is_some() && value.trim().is_empty() {
                return false;
            }
            if element.is("input") && element.input_type() == "email" && !value.is_empty() {
                return is_valid_email(&value);
            }
            true
        })
}

/// The `type=email` rule: `local@label(.label)*`
pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(c));
    let domain_ok = !domain.is_empty()
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    local_ok && domain_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Scheduler;

    fn submit(doc: &mut Document, scheduler: &mut Scheduler) {
        let form = Document::elements(doc)
            .into_iter()
            .find(|id| doc.element(*id).map(|e| e.is("form")).unwrap_or(false))
            .unwrap();
        let mut ctx = PageContext {
            document: doc,
            scheduler,
        };
        ContactForm.on_submit(&mut ctx, form);
    }

    fn fill(doc: &mut Document, id: &str, value: &str) {
        let node = doc.get_element_by_id(id).unwrap();
        doc.element_mut(node).unwrap().raw_value = value.to_string();
    }

    fn banner_visible(doc: &Document, class: &str) -> bool {
        let banner = doc.get_elements_by_class(class)[0];
        doc.is_visible(banner)
    }

    fn filled() -> Document {
        let mut doc = document();
        fill(&mut doc, "firstName", "Mike");
        fill(&mut doc, "lastName", "Baguncinha");
        fill(&mut doc, "email", "mikebaguncinha@email.com");
        fill(&mut doc, "open-text-area", "Teste");
        doc
    }

    #[test]
    fn test_valid_submission_shows_only_success() {
        let mut doc = filled();
        let mut scheduler = Scheduler::simulated();
        submit(&mut doc, &mut scheduler);
        assert!(banner_visible(&doc, "success"));
        assert!(!banner_visible(&doc, "error"));
    }

    #[test]
    fn test_banner_hides_after_timeout() {
        let mut doc = filled();
        let mut scheduler = Scheduler::simulated();
        submit(&mut doc, &mut scheduler);
        scheduler.advance(BANNER_TIMEOUT_MS - 1, &mut doc).unwrap();
        assert!(banner_visible(&doc, "success"));
        scheduler.advance(1, &mut doc).unwrap();
        assert!(!banner_visible(&doc, "success"));
    }

    #[test]
    fn test_empty_form_shows_only_error() {
        let mut doc = document();
        let mut scheduler = Scheduler::simulated();
        submit(&mut doc, &mut scheduler);
        assert!(banner_visible(&doc, "error"));
        assert!(!banner_visible(&doc, "success"));
    }

    #[test]
    fn test_phone_required_only_when_checkbox_checked() {
        let mut doc = filled();
        let mut scheduler = Scheduler::simulated();
        let checkbox = doc.get_element_by_id("phone-checkbox").unwrap();

        doc.element_mut(checkbox).unwrap().checked = true;
        ContactForm.on_change(
            &mut PageContext {
                document: &mut doc,
                scheduler: &mut scheduler,
            },
            checkbox,
        );
        submit(&mut doc, &mut scheduler);
        assert!(banner_visible(&doc, "error"));

        doc.element_mut(checkbox).unwrap().checked = false;
        ContactForm.on_change(
            &mut PageContext {
                document: &mut doc,
                scheduler: &mut scheduler,
            },
            checkbox,
        );
        submit(&mut doc, &mut scheduler);
        assert!(banner_visible(&doc, "success"));
    }

    #[test]
    fn test_email_rule() {
        assert!(is_valid_email("mikebaguncinha@email.com"));
        assert!(is_valid_email("a@b"));
        assert!(!is_valid_email("mikebaguncinha@email,com"));
        assert!(!is_valid_email("mikebaguncinha.email.com"));
        assert!(!is_valid_email("@email.com"));
        assert!(!is_valid_email("a@-email.com"));
        assert!(!is_valid_email("a@email..com"));
    }
}
