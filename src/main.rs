mod api;
mod db;
mod identity;
mod models;
mod params;
mod search;
mod suggest;
mod tui;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use api::{JobboerseClient, SuggestField, SuggestionSource};
use db::Database;
use params::SearchFilters;
use search::{SearchController, SearchSession};

#[derive(Parser)]
#[command(name = "pirsch")]
#[command(about = "Personal job-application tracker with job board search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Search the job board
    Search {
        /// Job title or keyword
        query: String,

        /// Location to search around
        location: String,

        /// Search radius in km (only meaningful with a location)
        #[arg(short, long)]
        distance: Option<u32>,

        /// Offer category (full-time, part-time, working-student,
        /// internship, apprenticeship, freelance)
        #[arg(short, long)]
        category: Option<String>,

        /// Number of pages to fetch
        #[arg(short, long, default_value = "1")]
        pages: usize,

        /// Open the interactive search screen
        #[arg(short, long)]
        interactive: bool,
    },

    /// Print autocomplete suggestions
    Suggest {
        /// What to complete: "berufe" (occupations) or "orte" (locations)
        kind: String,

        /// Partial input
        partial: String,

        /// Maximum number of suggestions
        #[arg(short, long, default_value = "8")]
        limit: usize,
    },

    /// Track an application
    Add {
        /// Company name
        company: String,

        /// Job title
        title: String,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long)]
        url: Option<String>,

        /// Where the posting came from (default: manual)
        #[arg(short, long)]
        source: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List tracked applications
    List {
        /// Filter by status (saved, applied, interview, offer, rejected, withdrawn)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by company
        #[arg(short, long)]
        company: Option<String>,
    },

    /// Show application details
    Show {
        /// Application ID
        id: i64,
    },

    /// Update application status
    Set {
        /// Application ID
        id: i64,

        /// New status (saved, applied, interview, offer, rejected, withdrawn)
        status: String,
    },

    /// Replace the notes on an application
    Note {
        /// Application ID
        id: i64,

        /// Note text
        text: String,
    },

    /// Delete an application
    Remove {
        /// Application ID
        id: i64,
    },

    /// Record an interview for an application
    Interview {
        /// Application ID
        id: i64,

        /// Date (YYYY-MM-DD)
        date: String,

        /// Interview kind (phone, video, onsite, ...)
        #[arg(short, long, default_value = "phone")]
        kind: String,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List interviews for an application
    Interviews {
        /// Application ID
        id: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let db = Database::open()?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Search {
            query,
            location,
            distance,
            category,
            pages,
            interactive,
        } => {
            db.ensure_initialized()?;

            let client = JobboerseClient::new()?;
            let filters = SearchFilters {
                category,
                distance_km: distance,
            };

            if interactive {
                let mut controller = SearchController::new(client.clone());
                controller.change_filters(filters)?;
                tui::run_search(&db, &mut controller, &client, &query, &location)?;
            } else {
                let mut controller = SearchController::new(client);
                controller.change_filters(filters)?;
                if !controller.start_search(&query, &location)? {
                    return Err(anyhow!("Both a search term and a location are required"));
                }

                let session = controller
                    .session()
                    .ok_or_else(|| anyhow!("No active search session"))?;
                println!(
                    "Results for '{}' in {}:\n",
                    session.query(),
                    session.location()
                );
                print_result_page(session);

                for _ in 1..pages {
                    if !controller.next_page()? {
                        break;
                    }
                    println!();
                    let session = controller
                        .session()
                        .ok_or_else(|| anyhow!("No active search session"))?;
                    print_result_page(session);
                }
            }
        }

        Commands::Suggest {
            kind,
            partial,
            limit,
        } => {
            let field = match kind.as_str() {
                "berufe" | "beruf" | "occupations" => SuggestField::Occupation,
                "orte" | "ort" | "locations" => SuggestField::Location,
                other => {
                    return Err(anyhow!(
                        "Unknown suggestion kind '{}'. Use 'berufe' or 'orte'.",
                        other
                    ))
                }
            };

            let client = JobboerseClient::new()?;
            // Suggestion failures are not fatal; degrade to no suggestions.
            let candidates = client.complete(field, &partial).unwrap_or_default();
            let ranked = suggest::rank(&candidates, &partial, limit);

            if ranked.is_empty() {
                println!("No suggestions.");
            } else {
                for suggestion in ranked {
                    println!("{}", suggestion);
                }
            }
        }

        Commands::Add {
            company,
            title,
            location,
            url,
            source,
            notes,
        } => {
            db.ensure_initialized()?;

            if let Some(existing) = db.find_duplicate(&company, &title, url.as_deref())? {
                println!(
                    "Looks like a duplicate of application #{} - not added.",
                    existing
                );
            } else {
                let id = db.add_application(
                    &company,
                    &title,
                    location.as_deref(),
                    url.as_deref(),
                    source.as_deref().or(Some("manual")),
                    notes.as_deref(),
                )?;
                println!("Tracking application #{}", id);
            }
        }

        Commands::List { status, company } => {
            db.ensure_initialized()?;
            let applications = db.list_applications(status.as_deref(), company.as_deref())?;
            if applications.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<6} {:<11} {:<30} {:<22} {:<16}",
                    "ID", "STATUS", "TITLE", "COMPANY", "LOCATION"
                );
                println!("{}", "-".repeat(87));
                for app in applications {
                    println!(
                        "{:<6} {:<11} {:<30} {:<22} {:<16}",
                        app.id,
                        app.status,
                        truncate(&app.title, 28),
                        truncate(&app.company, 20),
                        truncate(&app.location.unwrap_or_default(), 14)
                    );
                }
            }
        }

        Commands::Show { id } => {
            db.ensure_initialized()?;
            match db.get_application(id)? {
                Some(app) => {
                    println!("Application #{}", app.id);
                    println!("Company: {}", app.company);
                    println!("Title: {}", app.title);
                    println!("Status: {}", app.status);
                    if let Some(location) = &app.location {
                        println!("Location: {}", location);
                    }
                    if let Some(url) = &app.url {
                        println!("URL: {}", url);
                    }
                    if let Some(source) = &app.source {
                        println!("Source: {}", source);
                    }
                    println!("Created: {}", app.created_at);
                    println!("Updated: {}", app.updated_at);
                    if let Some(notes) = &app.notes {
                        println!("\n--- Notes ---\n{}", notes);
                    }

                    let interviews = db.list_interviews(id)?;
                    if !interviews.is_empty() {
                        println!("\nInterviews ({}):", interviews.len());
                        for interview in interviews {
                            let notes = interview
                                .notes
                                .map(|n| format!(" - {}", n))
                                .unwrap_or_default();
                            println!(
                                "  {} ({}){}",
                                interview.scheduled_on, interview.kind, notes
                            );
                        }
                    }
                }
                None => {
                    println!("Application #{} not found.", id);
                }
            }
        }

        Commands::Set { id, status } => {
            db.ensure_initialized()?;
            db.update_status(id, &status)?;
            println!("Application #{} is now '{}'.", id, status);
        }

        Commands::Note { id, text } => {
            db.ensure_initialized()?;
            db.set_notes(id, &text)?;
            println!("Updated notes on application #{}.", id);
        }

        Commands::Remove { id } => {
            db.ensure_initialized()?;
            db.delete_application(id)?;
            println!("Removed application #{}.", id);
        }

        Commands::Interview {
            id,
            date,
            kind,
            notes,
        } => {
            db.ensure_initialized()?;
            db.add_interview(id, &date, &kind, notes.as_deref())?;
            println!("Recorded {} interview on {} for application #{}.", kind, date, id);
        }

        Commands::Interviews { id } => {
            db.ensure_initialized()?;
            let interviews = db.list_interviews(id)?;
            if interviews.is_empty() {
                println!("No interviews recorded for application #{}.", id);
            } else {
                println!("{:<6} {:<12} {:<10} {:<30}", "ID", "DATE", "KIND", "NOTES");
                println!("{}", "-".repeat(60));
                for interview in interviews {
                    println!(
                        "{:<6} {:<12} {:<10} {:<30}",
                        interview.id,
                        interview.scheduled_on,
                        interview.kind,
                        truncate(&interview.notes.unwrap_or_default(), 28)
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_result_page(session: &SearchSession) {
    let slice = session.current_slice();
    if slice.is_empty() {
        println!("No results on page {}.", session.page());
        return;
    }

    println!(
        "{:<5} {:<32} {:<24} {:<18} {:>5} {:<12}",
        "#", "TITLE", "EMPLOYER", "LOCATION", "KM", "START"
    );
    println!("{}", "-".repeat(100));
    for (i, result) in slice.iter().enumerate() {
        let number = (session.page() - 1) * session.page_size() + i + 1;
        let km = result
            .distance_km
            .map(|d| format!("{:.0}", d))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<5} {:<32} {:<24} {:<18} {:>5} {:<12}",
            number,
            truncate(&result.title, 30),
            truncate(&result.employer, 22),
            truncate(&result.location, 16),
            km,
            truncate(&result.start_date_display(), 12)
        );
    }

    println!(
        "\nPage {} of {} ({} result(s))",
        session.page(),
        session.page_count(),
        session.result_count()
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
