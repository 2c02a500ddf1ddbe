use std::fmt::Write as _;

use crate::db::models::{Question, Test};
use crate::db::types::QuestionType;
use crate::services::exam_timing;

#[derive(Debug, Clone, Default)]
pub(crate) struct ExportOptions {
    pub(crate) include_answers: bool,
    pub(crate) course_label: Option<String>,
    pub(crate) date_label: Option<String>,
    pub(crate) name_line: bool,
}

/// Renders a test as a printable plain-text document.
///
/// Professors hand the result to word processors or print it directly, so
/// the layout is deliberately simple: a heading, the metadata block, the
/// numbered question list with lettered options, and (for the professor's
/// copy) an answer key at the end.
pub(crate) fn render_test(test: &Test, questions: &[Question], options: &ExportOptions) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", test.name);
    let _ = writeln!(out, "{}", "=".repeat(test.name.chars().count().max(4)));
    out.push('\n');

    if let Some(course) = options.course_label.as_deref().filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(out, "Kolegij: {}", course.trim());
    }
    if let Some(date) = options.date_label.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "Datum: {}", date.trim());
    }
    if options.name_line {
        let _ = writeln!(out, "Ime i prezime: ____________________________");
    }
    if options.course_label.is_some() || options.date_label.is_some() || options.name_line {
        out.push('\n');
    }

    if let Some(description) = test.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out, "{}", description.trim());
        out.push('\n');
    }

    let duration = exam_timing::display_duration(test.duration.as_deref(), questions);
    let _ = writeln!(out, "Trajanje: {duration}");
    let _ = writeln!(out, "Broj pitanja: {}", questions.len());
    let max_points: i32 = questions.iter().map(|q| q.points).sum();
    let _ = writeln!(out, "Ukupno bodova: {max_points}");
    out.push('\n');

    for (index, question) in questions.iter().enumerate() {
        let _ = writeln!(out, "{}. {} ({} bod)", index + 1, question.text.trim(), question.points);
        match question.qtype {
            QuestionType::Mcq => {
                for (i, option) in question.options.0.iter().enumerate() {
                    let _ = writeln!(out, "   {}) {}", letter(i), option);
                }
            }
            QuestionType::TrueFalse => {
                let _ = writeln!(out, "   a) Točno");
                let _ = writeln!(out, "   b) Netočno");
            }
            QuestionType::Short => {
                let _ = writeln!(out, "   Odgovor: ____________________________");
            }
        }
        out.push('\n');
    }

    if options.include_answers {
        let _ = writeln!(out, "Rješenja");
        let _ = writeln!(out, "--------");
        for (index, question) in questions.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", index + 1, question.correct_answer);
        }
    }

    out
}

/// Option letters a) b) c)... wrapping past `z` is not a case that occurs
/// with four-option tests but falls back to the raw index.
fn letter(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => ((b'a' + i) as char).to_string(),
        _ => format!("{}", index + 1),
    }
}

/// Builds a safe attachment filename from the test name.
pub(crate) fn export_filename(test_name: &str) -> String {
    let stem: String = test_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "test.txt".to_string()
    } else {
        format!("{stem}.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn renders_heading_meta_and_questions() {
        let test = test_support::test_row("t1", "Kolokvij 1", Some("Gradivo 1-5"));
        let questions = vec![
            test_support::mcq_question("q1", "B", 2),
            test_support::short_question("q2", 3),
        ];

        let doc = render_test(&test, &questions, &ExportOptions::default());

        assert!(doc.starts_with("Kolokvij 1\n"));
        assert!(doc.contains("Gradivo 1-5"));
        assert!(doc.contains("Broj pitanja: 2"));
        assert!(doc.contains("Ukupno bodova: 5"));
        assert!(doc.contains("1. "));
        assert!(doc.contains("   a) "));
        assert!(doc.contains("Odgovor: ____"));
        assert!(!doc.contains("Rješenja"));
    }

    #[test]
    fn answer_key_lists_correct_answers_in_order() {
        let test = test_support::test_row("t1", "Kolokvij", None);
        let questions = vec![
            test_support::mcq_question("q1", "B", 1),
            test_support::truefalse_question("q2", "True", 1),
        ];

        let options = ExportOptions { include_answers: true, ..ExportOptions::default() };
        let doc = render_test(&test, &questions, &options);
        let key = doc.split("Rješenja").nth(1).expect("answer key present");
        assert!(key.contains("1. B"));
        assert!(key.contains("2. True"));
    }

    #[test]
    fn header_labels_and_name_line() {
        let test = test_support::test_row("t1", "Kolokvij", None);
        let questions = vec![test_support::mcq_question("q1", "A", 1)];
        let options = ExportOptions {
            include_answers: false,
            course_label: Some("Matematika 1".to_string()),
            date_label: Some("15.6.2026.".to_string()),
            name_line: true,
        };

        let doc = render_test(&test, &questions, &options);
        assert!(doc.contains("Kolegij: Matematika 1"));
        assert!(doc.contains("Datum: 15.6.2026."));
        assert!(doc.contains("Ime i prezime: ____"));
    }

    #[test]
    fn truefalse_renders_fixed_options() {
        let test = test_support::test_row("t1", "Kviz", None);
        let questions = vec![test_support::truefalse_question("q1", "True", 1)];
        let doc = render_test(&test, &questions, &ExportOptions::default());
        assert!(doc.contains("a) Točno"));
        assert!(doc.contains("b) Netočno"));
    }

    #[test]
    fn filename_is_sanitized() {
        assert_eq!(export_filename("Kolokvij 1: Skupovi"), "Kolokvij_1__Skupovi.txt");
        assert_eq!(export_filename("   "), "test.txt");
        assert_eq!(export_filename("///"), "test.txt");
    }

    #[test]
    fn option_letters() {
        assert_eq!(letter(0), "a");
        assert_eq!(letter(3), "d");
    }
}
