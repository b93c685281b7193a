use crate::transport::TranslationResult;

/// Which side of the bilingual result is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextView {
    #[default]
    Original,
    Translated,
}

/// Local, network-free view over a finished translation.
#[derive(Debug, Clone)]
pub struct ResultPresenter {
    result: TranslationResult,
    view: TextView,
}

impl ResultPresenter {
    pub fn new(result: TranslationResult) -> Self {
        Self {
            result,
            view: TextView::default(),
        }
    }

    pub fn result(&self) -> &TranslationResult {
        &self.result
    }

    pub fn view(&self) -> TextView {
        self.view
    }

    pub fn show(&mut self, view: TextView) {
        self.view = view;
    }

    pub fn toggle(&mut self) {
        self.view = match self.view {
            TextView::Original => TextView::Translated,
            TextView::Translated => TextView::Original,
        };
    }

    pub fn visible_text(&self) -> &str {
        match self.view {
            TextView::Original => &self.result.original_text,
            TextView::Translated => &self.result.translated_text,
        }
    }

    /// Label for the active view, e.g. "Translated (HI)".
    pub fn view_label(&self) -> String {
        match self.view {
            TextView::Original => "Original (English)".to_string(),
            TextView::Translated => format!(
                "Translated ({})",
                self.result.target_language.to_uppercase()
            ),
        }
    }

    /// Plain-text rendering of both sides for saving to disk.
    pub fn export_text(&self) -> String {
        format!(
            "Original Text:\n{}\n\nTranslated Text:\n{}",
            self.result.original_text, self.result.translated_text
        )
    }

    /// File name for the export. Only `[A-Za-z0-9_-]` from the session id is
    /// kept, so the name never leaves the target directory.
    pub fn export_file_name(&self) -> String {
        let id: String = self
            .result
            .session_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        let id = if id.is_empty() { "result" } else { id.as_str() };
        format!("translation_{}.txt", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_result() -> TranslationResult {
        TranslationResult {
            session_id: "abc123".to_string(),
            original_text: "Hello world".to_string(),
            translated_text: "नमस्ते दुनिया".to_string(),
            target_language: "hi".to_string(),
            audio_available: false,
        }
    }

    #[test]
    fn test_defaults_to_original() {
        let presenter = ResultPresenter::new(create_result());

        assert_eq!(presenter.view(), TextView::Original);
        assert_eq!(presenter.visible_text(), "Hello world");
        assert_eq!(presenter.view_label(), "Original (English)");
    }

    #[test]
    fn test_toggle_switches_views() {
        let mut presenter = ResultPresenter::new(create_result());

        presenter.toggle();
        assert_eq!(presenter.view(), TextView::Translated);
        assert_eq!(presenter.visible_text(), "नमस्ते दुनिया");
        assert_eq!(presenter.view_label(), "Translated (HI)");

        presenter.toggle();
        assert_eq!(presenter.view(), TextView::Original);
    }

    #[test]
    fn test_show_is_idempotent() {
        let mut presenter = ResultPresenter::new(create_result());

        presenter.show(TextView::Translated);
        presenter.show(TextView::Translated);
        assert_eq!(presenter.visible_text(), "नमस्ते दुनिया");
    }

    #[test]
    fn test_export_text_format() {
        let presenter = ResultPresenter::new(create_result());

        assert_eq!(
            presenter.export_text(),
            "Original Text:\nHello world\n\nTranslated Text:\nनमस्ते दुनिया"
        );
        assert_eq!(presenter.export_file_name(), "translation_abc123.txt");
    }

    #[test]
    fn test_export_file_name_strips_path_characters() {
        let with_id = |id: &str| {
            ResultPresenter::new(TranslationResult {
                session_id: id.to_string(),
                ..create_result()
            })
            .export_file_name()
        };

        assert_eq!(with_id("../../etc/passwd"), "translation_etcpasswd.txt");
        assert_eq!(with_id("a/b\\c"), "translation_abc.txt");
        assert_eq!(with_id("2024-01_x"), "translation_2024-01_x.txt");
        assert_eq!(with_id("../"), "translation_result.txt");
        assert_eq!(with_id(""), "translation_result.txt");
    }

    #[test]
    fn test_result_is_not_mutated_by_view_changes() {
        let mut presenter = ResultPresenter::new(create_result());
        presenter.toggle();

        assert_eq!(presenter.result(), &create_result());
    }
}
