//! Privacy policy page linked from the contact form

use super::{NoScript, Page};
use crate::dom::Document;

pub const PATH: &str = "src/privacy.html";
pub const TITLE: &str = "Central de Atendimento ao Cliente TAT - Política de privacidade";

pub fn page() -> Page {
    let mut doc = Document::new(TITLE);
    let body = doc.body();

    let title = doc.append_element(body, "h1", &[("id", "title")]);
    doc.append_text(title, "CAC TAT - Política de privacidade");

    let content = doc.append_element(body, "div", &[("id", "white-background")]);
    for paragraph in [
        "Não salvamos dados submetidos no formulário da aplicação CAC TAT.",
        "Utilizamos as tecnologias HTML, CSS e JavaScript, para simular uma aplicação real.",
        "No entanto, a aplicação é um exemplo, sem qualquer persistência de dados, e usada para fins de ensino.",
    ] {
        let p = doc.append_element(content, "p", &[]);
        doc.append_text(p, paragraph);
    }
    let signature = doc.append_element(content, "p", &[]);
    doc.append_text(signature, "Talking About Testing");

    Page {
        document: doc,
        script: Box::new(NoScript),
    }
}
