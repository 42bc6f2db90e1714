use std::sync::OnceLock;

use regex::Regex;

use super::from_html::read_table;
use crate::cache::extract_copy_id;
use crate::types::CopyDataModel;

/// A recognizer for one producer's HTML dialect.
///
/// Plugins are consulted in registration order; the first to claim the
/// content converts it. A plugin may decline after claiming by returning
/// None, in which case the generic reader runs.
pub trait PastePlugin {
    fn name(&self) -> &str;
    fn can_handle(&self, html: &str) -> bool;
    fn convert(&self, html: &str) -> Option<CopyDataModel>;
}

/// Recognizer for word-processor exports. Strips the conditional comments
/// and office-namespace noise those producers wrap around their tables,
/// then reads the table generically.
pub struct WordPastePlugin;

impl PastePlugin for WordPastePlugin {
    fn name(&self) -> &str {
        "word"
    }

    fn can_handle(&self, html: &str) -> bool {
        html.contains("urn:schemas-microsoft-com:office:word")
            || html.contains("MsoNormalTable")
            || html.contains("MsoTableGrid")
    }

    fn convert(&self, html: &str) -> Option<CopyDataModel> {
        static CONDITIONAL_COMMENT: OnceLock<Regex> = OnceLock::new();
        static OFFICE_TAG: OnceLock<Regex> = OnceLock::new();
        static XML_DECL: OnceLock<Regex> = OnceLock::new();

        let conditional = CONDITIONAL_COMMENT
            .get_or_init(|| Regex::new(r"(?s)<!--\[if.*?<!\[endif\]-->").unwrap());
        let office_tag = OFFICE_TAG.get_or_init(|| Regex::new(r"</?[ovw]:[^>]*>").unwrap());
        let xml_decl = XML_DECL.get_or_init(|| Regex::new(r"<\?xml[^>]*>").unwrap());

        let cleaned = conditional.replace_all(html, "");
        let cleaned = office_tag.replace_all(&cleaned, "");
        let cleaned = xml_decl.replace_all(&cleaned, "");

        let model = read_table(&cleaned);
        if model.cell_matrix.is_empty() {
            None
        } else {
            Some(model)
        }
    }
}

/// Recognizer for this system's own exports when the copy cache no longer
/// holds the entry (evicted, or another session). The markup is regular,
/// so the generic reader applies directly.
pub struct GridPastePlugin;

impl PastePlugin for GridPastePlugin {
    fn name(&self) -> &str {
        "grid"
    }

    fn can_handle(&self, html: &str) -> bool {
        extract_copy_id(html).is_some()
    }

    fn convert(&self, html: &str) -> Option<CopyDataModel> {
        let model = read_table(html);
        if model.cell_matrix.is_empty() {
            None
        } else {
            Some(model)
        }
    }
}
