//! CLI module for the quillnotes application
//!
//! This module maps parsed subcommands onto `NoteContext` operations and
//! renders the results.
use chrono::NaiveDate;
use log::{info, warn};

use crate::{
    parse_tags, snippet, start_of_day, Commands, Note, NoteContext, NoteDraft, NoteError,
    NoteFilters, Result, SortKey, FONT_OPTIONS,
};

/// CLI Application handler - processes CLI commands and interfaces with NoteContext
pub struct App {
    /// The note store handle
    context: NoteContext,

    /// Whether to display verbose output
    verbose: bool,
}

/// Options for the `list` subcommand.
pub struct ListNotesOptions {
    pub search: Option<String>,
    pub tags: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort: SortKey,
    pub limit: usize,
    pub json: bool,
    pub brief: bool,
}

/// Field changes for the `edit` subcommand. `None` keeps the current value.
pub struct EditNoteOptions {
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<String>,
    pub font: Option<String>,
    pub background: Option<String>,
}

impl App {
    /// Create a new CLI application over the given context
    pub fn new(context: NoteContext, verbose: bool) -> Self {
        Self { context, verbose }
    }

    /// Loads stored notes, warning once if they could not be read.
    pub async fn start(&self) -> Result<()> {
        let report = self.context.init().await?;

        if let Some(message) = &report.corruption {
            eprintln!(
                "{} stored notes could not be read and were ignored: {}",
                console::style("warning:").yellow().bold(),
                message
            );
        }
        if report.duplicates_dropped > 0 {
            warn!("Ignored {} notes with repeated ids", report.duplicates_dropped);
        }
        if self.verbose {
            println!("Loaded {} notes", report.notes_loaded);
        }
        Ok(())
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Create {
                title,
                content,
                tags,
                font,
                background,
            } => self.create_note(title, content, tags, font, background).await?,

            Commands::View { id, json } => self.view_note(&id, json).await?,

            Commands::List {
                search,
                tags,
                from,
                to,
                sort,
                limit,
                json,
                brief,
            } => {
                self.list_notes(ListNotesOptions {
                    search,
                    tags,
                    from,
                    to,
                    sort,
                    limit,
                    json,
                    brief,
                })
                .await?
            }

            Commands::Edit {
                id,
                title,
                content,
                tags,
                font,
                background,
            } => {
                self.handle_edit(EditNoteOptions {
                    id,
                    title,
                    content,
                    tags,
                    font,
                    background,
                })
                .await?
            }

            Commands::Delete { id } => self.handle_delete(&id).await?,

            Commands::Tag {
                id,
                add,
                remove,
                list,
            } => self.handle_tag(&id, add, remove, list).await?,

            Commands::Tags => self.list_all_tags().await?,

            Commands::Fonts => self.list_fonts(),
        }

        Ok(())
    }

    async fn create_note(
        &self,
        title: String,
        content: String,
        tags: Option<String>,
        font: Option<String>,
        background: Option<String>,
    ) -> Result<()> {
        let draft = NoteDraft {
            title,
            content,
            tags: parse_tags(tags),
            font,
            background_image: background,
        };

        let note = self.context.create(draft).await?;
        println!("Note created with ID: {}", note.id);
        Ok(())
    }

    async fn view_note(&self, id: &str, json: bool) -> Result<()> {
        let note = self.require_note(id).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&note)?);
            return Ok(());
        }

        println!("{}", console::style(&note.title).bold());
        println!(
            "ID: {} | Created: {} | Updated: {}",
            note.id,
            note.created_at.format("%Y-%m-%d %H:%M"),
            note.updated_at.format("%Y-%m-%d %H:%M")
        );
        println!("Font: {}", note.font_or_default());
        if let Some(url) = &note.background_image {
            println!("Background: {}", url);
        }
        if !note.tags.is_empty() {
            println!("Tags: {}", console::style(format_tags(&note.tags)).cyan());
        }
        println!("\n{}", note.content);
        Ok(())
    }

    /// List notes according to provided filters and options
    async fn list_notes(&self, options: ListNotesOptions) -> Result<()> {
        let filters = NoteFilters {
            search_term: options.search,
            tags: parse_tags(options.tags),
            date_from: options.from.map(day_start).transpose()?,
            date_to: options.to.map(day_start).transpose()?,
        };

        let mut notes = self.context.apply(&filters, options.sort).await?;
        info!("Listing {} notes sorted by {}", notes.len(), options.sort);

        if notes.is_empty() && filters.is_empty() && !options.json {
            println!("No notes yet. Add one with `quillnotes create`.");
            return Ok(());
        }

        if options.limit > 0 && notes.len() > options.limit {
            notes.truncate(options.limit);
        }

        if options.json {
            self.display_notes_json(&notes, options.brief)
        } else {
            self.display_notes_text(&notes, options.brief);
            Ok(())
        }
    }

    /// Display notes in JSON format
    fn display_notes_json(&self, notes: &[Note], brief: bool) -> Result<()> {
        if brief {
            let simplified: Vec<serde_json::Value> = notes
                .iter()
                .map(|note| serde_json::json!({ "id": note.id, "title": note.title }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&simplified)?);
        } else {
            println!("{}", serde_json::to_string_pretty(notes)?);
        }
        Ok(())
    }

    /// Display notes in text format
    fn display_notes_text(&self, notes: &[Note], brief: bool) {
        if notes.is_empty() {
            println!("No notes found matching the criteria.");
            return;
        }

        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if brief {
                println!("{}  {}", note.id, note.title);
                continue;
            }

            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            println!(
                "ID: {} | Updated: {}",
                note.id,
                note.updated_at.format("%Y-%m-%d %H:%M")
            );
            println!("Title: {}", console::style(&note.title).bold());

            if !note.tags.is_empty() {
                println!("Tags: {}", console::style(format_tags(&note.tags)).cyan());
            }

            let preview = snippet(note);
            if !preview.is_empty() {
                println!("\n{}", preview);
            }
        }

        println!(
            "\nFound {} note{}",
            notes.len(),
            if notes.len() == 1 { "" } else { "s" }
        );
    }

    async fn handle_edit(&self, options: EditNoteOptions) -> Result<()> {
        let mut note = self.require_note(&options.id).await?;

        if let Some(title) = options.title {
            note.title = title;
        }
        if let Some(content) = options.content {
            note.content = content;
        }
        if options.tags.is_some() {
            note.tags = parse_tags(options.tags);
        }
        if let Some(font) = options.font {
            note.font = Some(font);
        }
        if let Some(background) = options.background {
            note.background_image = Some(background);
        }

        let updated = self.context.update(note).await?;
        println!("Note {} updated", updated.id);
        Ok(())
    }

    async fn handle_delete(&self, id: &str) -> Result<()> {
        self.context.delete(id).await?;
        println!("Note {} deleted", id);
        Ok(())
    }

    async fn handle_tag(
        &self,
        id: &str,
        add: Option<String>,
        remove: Option<String>,
        list: bool,
    ) -> Result<()> {
        let to_add = parse_tags(add);
        if !to_add.is_empty() {
            let added = self.context.add_tags(id, to_add.as_slice()).await?;
            if added.is_empty() {
                println!("No new tags added");
            } else {
                println!("Added: {}", format_tags(&added));
            }
        }

        let to_remove = parse_tags(remove);
        if !to_remove.is_empty() {
            let removed = self.context.remove_tags(id, to_remove.as_slice()).await?;
            if removed.is_empty() {
                println!("None of those tags were on the note");
            } else {
                println!("Removed: {}", format_tags(&removed));
            }
        }

        if list || (to_add.is_empty() && to_remove.is_empty()) {
            let note = self.require_note(id).await?;
            if note.tags.is_empty() {
                println!("Note {} has no tags", id);
            } else {
                println!("{}", console::style(format_tags(&note.tags)).cyan());
            }
        }

        Ok(())
    }

    async fn list_all_tags(&self) -> Result<()> {
        let tags = self.context.all_tags().await?;
        if tags.is_empty() {
            println!("No tags in use");
        }
        for tag in tags {
            println!("{}", tag);
        }
        Ok(())
    }

    fn list_fonts(&self) {
        for (i, font) in FONT_OPTIONS.iter().enumerate() {
            let marker = if i == 0 { " (default)" } else { "" };
            println!("{:<16} {}{}", font.name, font.value, marker);
        }
    }

    async fn require_note(&self, id: &str) -> Result<Note> {
        self.context
            .get_by_id(id)
            .await?
            .ok_or_else(|| NoteError::NotFound { id: id.to_string() })
    }
}

fn day_start(date: NaiveDate) -> Result<chrono::DateTime<chrono::Utc>> {
    start_of_day(date).ok_or_else(|| NoteError::ApplicationError {
        message: format!("{} has no local midnight", date),
    })
}

fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("#{}", tag))
        .collect::<Vec<_>>()
        .join(" ")
}
