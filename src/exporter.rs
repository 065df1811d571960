//! Markdown rendering and file output.

use crate::error::ExportError;
use crate::extractor::{Extractor, Highlight};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Render highlights as Markdown. Input is assumed sorted by book title;
/// groups keep the order in which each title first appears.
pub fn write_markdown<W: Write>(writer: &mut W, highlights: &[Highlight]) -> std::io::Result<()> {
    let mut current_book: Option<&str> = None;

    for highlight in highlights {
        if current_book != Some(highlight.book_title.as_str()) {
            current_book = Some(highlight.book_title.as_str());
            writeln!(writer, "\n## {}\n", highlight.book_title)?;
        }

        writeln!(writer, "> {}", highlight.text)?;
        if let Some(ref context) = highlight.context {
            writeln!(writer, "\nContext: {}", context)?;
        }
        if let Some(ref note) = highlight.note {
            writeln!(writer, "\nNote: {}", note)?;
        }
        writeln!(writer)?;
        if let Some(ref chapter) = highlight.chapter {
            writeln!(writer, "- Chapter: {}", chapter)?;
        }
        writeln!(
            writer,
            "- Date: {}\n",
            highlight.created_at.format("%Y-%m-%d %H:%M:%S")
        )?;
    }

    Ok(())
}

/// Derive the export filename from the filter:
/// `book_highlights_<slug>.md`, or `book_highlights_all.md` when unfiltered.
pub fn output_filename(book_title: Option<&str>) -> String {
    match book_title.map(slug::slugify) {
        Some(s) if !s.is_empty() => format!("book_highlights_{}.md", s),
        _ => "book_highlights_all.md".to_string(),
    }
}

/// Query, group and write highlights to `output_path`, overwriting any
/// existing file. When the filter matches nothing, fails with
/// [`ExportError::EmptyResult`] and writes nothing.
pub fn export_to_markdown(
    extractor: &Extractor,
    output_path: &Path,
    book_title: Option<&str>,
) -> Result<(), ExportError> {
    let highlights = extractor.get_highlights(book_title)?;
    if highlights.is_empty() {
        return Err(ExportError::EmptyResult {
            filter: book_title.map(str::to_string),
        });
    }

    let io_err = |source| ExportError::IoWrite {
        path: output_path.to_path_buf(),
        source,
    };

    let file = File::create(output_path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    write_markdown(&mut writer, &highlights).map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Style;
    use chrono::{DateTime, NaiveDateTime, Utc};

    fn ts(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    fn make_highlight(book: &str, text: &str, note: Option<&str>) -> Highlight {
        Highlight {
            text: text.to_string(),
            created_at: ts("2024-03-01 10:30:00"),
            book_title: book.to_string(),
            chapter: None,
            note: note.map(String::from),
            context: None,
            style: Style::Highlight,
        }
    }

    fn render(highlights: &[Highlight]) -> String {
        let mut buf = Vec::new();
        write_markdown(&mut buf, highlights).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn empty_store() -> tempfile::NamedTempFile {
        let db = tempfile::NamedTempFile::new().unwrap();
        let conn = rusqlite::Connection::open(db.path()).unwrap();
        conn.execute_batch(
            "CREATE TABLE ZAEANNOTATION (
                ZANNOTATIONSELECTEDTEXT TEXT,
                ZANNOTATIONNOTE TEXT,
                ZANNOTATIONREPRESENTATIVETEXT TEXT,
                ZFUTUREPROOFING5 TEXT,
                ZANNOTATIONISUNDERLINE INTEGER,
                ZANNOTATIONDELETED INTEGER,
                ZANNOTATIONCREATIONDATE REAL,
                ZANNOTATIONASSETID TEXT
            );
            CREATE TABLE ZBKLIBRARYASSET (ZASSETID TEXT, ZTITLE TEXT, ZAUTHOR TEXT);",
        )
        .unwrap();
        db
    }

    #[test]
    fn test_dune_scenario_one_heading_two_blocks_one_note() {
        let highlights = vec![
            make_highlight("Dune", "Fear is the mind-killer.", Some("classic")),
            make_highlight("Dune", "He who controls the spice", None),
        ];

        let out = render(&highlights);

        assert_eq!(out.matches("## Dune").count(), 1);
        assert_eq!(out.matches("> ").count(), 2);
        assert_eq!(out.matches("Note: ").count(), 1);
        assert!(out.contains("Note: classic"));
        assert!(out.contains("- Date: 2024-03-01 10:30:00"));
    }

    #[test]
    fn test_groups_follow_input_order() {
        let highlights = vec![
            make_highlight("Dune", "one", None),
            make_highlight("Dune Messiah", "two", None),
        ];

        let out = render(&highlights);

        let dune = out.find("## Dune\n").unwrap();
        let messiah = out.find("## Dune Messiah\n").unwrap();
        assert!(dune < messiah);
    }

    #[test]
    fn test_chapter_and_context_lines_only_when_present() {
        let mut with_all = make_highlight("Dune", "text", None);
        with_all.chapter = Some("Book One".to_string());
        with_all.context = Some("the sentence around it".to_string());
        let bare = make_highlight("Dune", "other", None);

        let out = render(&[with_all, bare]);

        assert_eq!(out.matches("- Chapter: ").count(), 1);
        assert!(out.contains("- Chapter: Book One"));
        assert_eq!(out.matches("Context: ").count(), 1);
        assert!(out.contains("Context: the sentence around it"));
        assert_eq!(out.matches("- Date: ").count(), 2);
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let highlights = vec![
            make_highlight("Dune", "Fear is the mind-killer.", Some("classic")),
            make_highlight("Snow Crash", "The Deliverator", None),
        ];

        assert_eq!(render(&highlights), render(&highlights));
    }

    #[test]
    fn test_output_filename_from_filter() {
        assert_eq!(
            output_filename(Some("Dune Messiah!")),
            "book_highlights_dune-messiah.md"
        );
        assert_eq!(output_filename(None), "book_highlights_all.md");
        assert_eq!(output_filename(Some("!!!")), "book_highlights_all.md");
    }

    #[test]
    fn test_empty_result_writes_no_file() {
        let db = empty_store();
        let extractor = Extractor::open(db.path()).unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let out_path = out_dir.path().join("book_highlights_dune.md");

        let result = export_to_markdown(&extractor, &out_path, Some("dune"));

        assert!(matches!(
            result,
            Err(ExportError::EmptyResult { filter: Some(ref f) }) if f == "dune"
        ));
        assert!(!out_path.exists());
    }

    #[test]
    fn test_unwritable_output_path_is_io_write() {
        let db = empty_store();
        {
            let conn = rusqlite::Connection::open(db.path()).unwrap();
            conn.execute_batch(
                "INSERT INTO ZBKLIBRARYASSET VALUES ('A1', 'Dune', 'Herbert');
                 INSERT INTO ZAEANNOTATION VALUES
                     ('Fear is the mind-killer.', NULL, NULL, NULL, 0, 0, 0.0, 'A1');",
            )
            .unwrap();
        }

        let extractor = Extractor::open(db.path()).unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let out_path = out_dir.path().join("no-such-dir/book_highlights_all.md");

        let result = export_to_markdown(&extractor, &out_path, None);

        assert!(matches!(
            result,
            Err(ExportError::IoWrite { ref path, .. }) if path == &out_path
        ));
    }

    #[test]
    fn test_export_overwrites_and_is_idempotent() {
        let db = empty_store();
        {
            let conn = rusqlite::Connection::open(db.path()).unwrap();
            conn.execute_batch(
                "INSERT INTO ZBKLIBRARYASSET VALUES ('A1', 'Dune', 'Herbert');
                 INSERT INTO ZAEANNOTATION VALUES
                     ('Fear is the mind-killer.', NULL, NULL, NULL, 0, 0, 0.0, 'A1');",
            )
            .unwrap();
        }

        let extractor = Extractor::open(db.path()).unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let out_path = out_dir.path().join("book_highlights_all.md");
        std::fs::write(&out_path, "stale contents").unwrap();

        export_to_markdown(&extractor, &out_path, None).unwrap();
        let first = std::fs::read_to_string(&out_path).unwrap();
        export_to_markdown(&extractor, &out_path, None).unwrap();
        let second = std::fs::read_to_string(&out_path).unwrap();

        assert!(first.contains("## Dune"));
        assert!(!first.contains("stale"));
        assert_eq!(first, second);
    }
}
