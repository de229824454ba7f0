use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use dose_core::calendar::{calendar_counts, week_view};
use dose_core::config::DataConfig;
use dose_core::tracker::{self, Dashboard};
use dose_core::*;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "medtrack")]
#[command(about = "Medication adherence tracker for caregivers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Evaluate as if the local time were this (YYYY-MM-DDTHH:MM:SS)
    #[arg(long, global = true)]
    now: Option<NaiveDateTime>,

    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register, view and edit patients
    Patient {
        #[command(subcommand)]
        command: PatientCommand,
    },

    /// Prescribe, list, edit and remove medications
    Med {
        #[command(subcommand)]
        command: MedCommand,
    },

    /// Show a medication's full dose schedule
    Doses {
        /// Medication id
        medication_id: Uuid,
    },

    /// Today's doses by urgency (default)
    Today,

    /// Doses for each day of a week
    Week {
        /// Weeks relative to the current one (-1 = last week)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
    },

    /// Taken/total doses per day over a date range
    Calendar {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
    },

    /// Mark a dose as taken now
    Take {
        /// Dose id
        dose_id: Uuid,
    },

    /// Mark a dose as not taken
    Untake {
        /// Dose id
        dose_id: Uuid,
    },

    /// Export doses to CSV
    Export {
        /// Output file
        #[arg(long)]
        out: PathBuf,

        /// Only this medication's doses
        #[arg(long)]
        medication: Option<Uuid>,
    },
}

#[derive(Subcommand)]
enum PatientCommand {
    /// Register a patient
    Add {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List patients
    List,

    /// Show one patient and their medications
    Show { id: Uuid },

    /// Edit a patient's details
    Update {
        id: Uuid,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
enum MedCommand {
    /// Prescribe a medication and schedule all of its doses
    Add {
        /// Patient id
        #[arg(long)]
        patient: Uuid,

        #[arg(long)]
        name: String,

        /// Total number of doses
        #[arg(long)]
        quantity: u32,

        /// Doses per day (daily) or per week (weekly)
        #[arg(long)]
        frequency: u32,

        /// Cadence: daily or weekly
        #[arg(long = "type", value_name = "TYPE")]
        kind: String,

        /// First dose date (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,

        #[arg(long)]
        dosage: Option<String>,

        #[arg(long)]
        rx_number: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// List medications
    List {
        /// Only this patient's medications
        #[arg(long)]
        patient: Option<Uuid>,
    },

    /// Show one medication
    Show { id: Uuid },

    /// Edit display fields (the dose schedule is never regenerated)
    Update {
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        dosage: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        rx_number: Option<String>,

        /// true or false
        #[arg(long, action = clap::ArgAction::Set)]
        active: Option<bool>,
    },

    /// Delete a medication and all of its doses
    Remove { id: Uuid },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        dose_core::logging::init_with_level("debug");
    } else {
        dose_core::logging::init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let mut store = JsonStore::new(DataConfig::store_path(&data_dir));
    let now = cli
        .now
        .unwrap_or_else(|| chrono::Local::now().naive_local());
    tracing::debug!("Using store {:?}, evaluating at {}", store.path(), now);

    match cli.command {
        Some(Commands::Patient { command }) => cmd_patient(&store, command, now),
        Some(Commands::Med { command }) => cmd_med(&store, command, now),
        Some(Commands::Doses { medication_id }) => cmd_doses(&store, medication_id, now),
        Some(Commands::Week { offset }) => cmd_week(&store, offset, &config, now),
        Some(Commands::Calendar { from, to }) => cmd_calendar(&store, from, to),
        Some(Commands::Take { dose_id }) => {
            let dose = mark_taken(&mut store, dose_id, now)?;
            println!("✓ Dose {} marked taken at {}", dose.id, fmt_time(now));
            Ok(())
        }
        Some(Commands::Untake { dose_id }) => {
            let dose = unmark_taken(&mut store, dose_id)?;
            println!("✓ Dose {} marked not taken", dose.id);
            Ok(())
        }
        Some(Commands::Export { out, medication }) => {
            let count = export_doses(&store, medication, &out, now)?;
            println!("✓ Exported {} doses", count);
            println!("  CSV: {}", out.display());
            Ok(())
        }
        Some(Commands::Today) | None => cmd_today(&store, &config, now),
    }
}

fn cmd_patient(store: &JsonStore, command: PatientCommand, now: NaiveDateTime) -> Result<()> {
    match command {
        PatientCommand::Add {
            first_name,
            last_name,
            dob,
            notes,
        } => {
            let patient = tracker::register_patient(
                store,
                NewPatient {
                    first_name,
                    last_name,
                    date_of_birth: dob,
                    notes,
                },
                now,
            )?;
            println!("✓ Registered {}", patient.display_name());
            println!("  id: {}", patient.id);
        }
        PatientCommand::List => {
            let patients = tracker::list_patients(store)?;
            if patients.is_empty() {
                println!("No patients registered.");
            }
            for patient in patients {
                let dob = patient
                    .date_of_birth
                    .map(|d| format!("  born {}", d))
                    .unwrap_or_default();
                println!("{}  {}{}", patient.id, patient.display_name(), dob);
            }
        }
        PatientCommand::Show { id } => {
            let patient = tracker::get_patient(store, id)?;
            let medications = tracker::list_medications(store, Some(id))?;
            display_patient(&patient);
            println!("  Medications: {}", medications.len());
            for medication in medications {
                print!("    ");
                display_medication_line(&medication);
            }
            println!();
        }
        PatientCommand::Update {
            id,
            first_name,
            last_name,
            dob,
            notes,
        } => {
            let update = PatientUpdate {
                first_name,
                last_name,
                date_of_birth: dob,
                notes,
            };
            if update.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            let patient = tracker::update_patient(store, id, update)?;
            println!("✓ Updated patient");
            display_patient(&patient);
            println!();
        }
    }
    Ok(())
}

fn cmd_med(store: &JsonStore, command: MedCommand, now: NaiveDateTime) -> Result<()> {
    match command {
        MedCommand::Add {
            patient,
            name,
            quantity,
            frequency,
            kind,
            start_date,
            dosage,
            rx_number,
            description,
        } => {
            let schedule = ScheduleConfig::parse(frequency, &kind, &start_date)?;
            let (medication, doses) = tracker::create_medication(
                store,
                NewMedication {
                    patient_id: patient,
                    name,
                    description,
                    dosage,
                    quantity,
                    rx_number,
                    schedule,
                },
                now,
            )?;

            println!("✓ Added {} ({})", medication.name, medication.id);
            println!(
                "  {} doses scheduled, {} per {} from {}",
                doses.len(),
                medication.schedule.frequency,
                cadence_unit(medication.schedule.kind),
                medication.schedule.start_date
            );
            if let Some(last) = doses.last() {
                println!("  Last dose: {}", last.scheduled_date.date());
            }
        }
        MedCommand::List { patient } => {
            let medications = tracker::list_medications(store, patient)?;
            if medications.is_empty() {
                println!("No medications.");
            }
            for medication in medications {
                display_medication_line(&medication);
            }
        }
        MedCommand::Show { id } => {
            let medication = tracker::get_medication(store, id)?;
            display_medication(&medication);
        }
        MedCommand::Update {
            id,
            name,
            dosage,
            description,
            rx_number,
            active,
        } => {
            let update = MedicationUpdate {
                name,
                description,
                dosage,
                rx_number,
                is_active: active,
            };
            if update.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            let medication = tracker::update_medication(store, id, update)?;
            println!("✓ Updated medication");
            display_medication(&medication);
        }
        MedCommand::Remove { id } => {
            let (medication, removed) = tracker::delete_medication(store, id)?;
            println!(
                "✓ Removed {} and its {} scheduled doses",
                medication.name, removed
            );
        }
    }
    Ok(())
}

fn cmd_doses(store: &JsonStore, medication_id: Uuid, now: NaiveDateTime) -> Result<()> {
    let medication = tracker::get_medication(store, medication_id)?;
    let schedule = tracker::medication_schedule(store, medication_id, now)?;
    let taken = schedule.iter().filter(|(d, _)| d.is_taken()).count();

    println!("{}: {}/{} taken", medication.name, taken, schedule.len());
    for (dose, status) in schedule {
        let taken_at = dose
            .taken_at
            .map(|t| format!("  at {}", fmt_time(t)))
            .unwrap_or_default();
        println!(
            "  {}  {:<9} {}{}",
            fmt_time(dose.scheduled_date),
            status.label(),
            dose.id,
            taken_at
        );
    }
    Ok(())
}

fn cmd_today(store: &JsonStore, config: &Config, now: NaiveDateTime) -> Result<()> {
    let Dashboard { summary, groups } = tracker::dashboard(store, now)?;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  TODAY  {}", now.format("%A, %B %-d"));
    println!("╰─────────────────────────────────────────╯");
    println!(
        "  Overdue: {}   Due now: {}   Upcoming: {}   Total today: {}",
        summary.overdue, summary.due_now, summary.upcoming, summary.total_today
    );

    if summary.total_today == 0 {
        println!("\n  No doses scheduled today.");
        return Ok(());
    }

    display_section("OVERDUE", &groups.overdue);
    display_section("DUE NOW", &groups.due_now);
    display_section("UPCOMING", &groups.upcoming);
    if config.dashboard.show_taken {
        display_section("TAKEN", &groups.taken);
    }
    println!();
    Ok(())
}

fn cmd_week(store: &JsonStore, offset: i64, config: &Config, now: NaiveDateTime) -> Result<()> {
    let days = week_view(store, offset, config.calendar.week_start, now)?;

    for (date, doses) in days {
        let marker = if date == now.date() { " (today)" } else { "" };
        let taken = doses.iter().filter(|d| d.dose.is_taken()).count();
        println!(
            "{}{}  {}/{} taken",
            date.format("%a %Y-%m-%d"),
            marker,
            taken,
            doses.len()
        );
        let mut current: Option<TimeOfDay> = None;
        for dose in doses {
            let part = TimeOfDay::of(dose.dose.scheduled_date);
            if current != Some(part) {
                println!("  {}", part.label());
                current = Some(part);
            }
            println!("    {}", dose_line(&dose));
        }
    }
    Ok(())
}

fn cmd_calendar(store: &JsonStore, from: NaiveDate, to: NaiveDate) -> Result<()> {
    let counts = calendar_counts(store, from, to)?;
    if counts.is_empty() {
        println!("No doses between {} and {}.", from, to);
    }
    for (date, count) in counts {
        let level = match count.level() {
            AdherenceLevel::Complete => "complete",
            AdherenceLevel::Partial => "partial",
            AdherenceLevel::Missed => "none taken",
        };
        println!("{}  {}/{}  {}", date, count.taken, count.total, level);
    }
    Ok(())
}

fn cadence_unit(kind: ScheduleType) -> &'static str {
    match kind {
        ScheduleType::Daily => "day",
        ScheduleType::Weekly => "week",
    }
}

fn fmt_time(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

fn dose_line(dose: &DoseWithDetails) -> String {
    let dosage = dose
        .dosage
        .as_ref()
        .map(|d| format!(" {}", d))
        .unwrap_or_default();
    format!(
        "{}  {}{} · {}  [{}]  {}",
        dose.dose.scheduled_date.format("%H:%M"),
        dose.medication_name,
        dosage,
        dose.patient_name,
        dose.status,
        dose.dose.id
    )
}

fn display_section(title: &str, doses: &[DoseWithDetails]) {
    if doses.is_empty() {
        return;
    }
    println!();
    println!("  {} ({})", title, doses.len());
    for dose in doses {
        println!("  → {}", dose_line(dose));
    }
}

fn display_patient(patient: &Patient) {
    println!();
    println!("  {}", patient.display_name());
    if let Some(dob) = patient.date_of_birth {
        println!("  Born: {}", dob);
    }
    if let Some(ref notes) = patient.notes {
        println!("  Notes: {}", notes);
    }
    println!("  id: {}", patient.id);
}

fn display_medication_line(medication: &Medication) {
    let inactive = if medication.is_active { "" } else { "  (inactive)" };
    println!(
        "{}  {}  {} doses, {}x {}{}",
        medication.id,
        medication.name,
        medication.quantity,
        medication.schedule.frequency,
        medication.schedule.kind,
        inactive
    );
}

fn display_medication(medication: &Medication) {
    println!();
    println!("  {}", medication.name);
    if let Some(ref dosage) = medication.dosage {
        println!("  Dosage: {}", dosage);
    }
    if let Some(ref description) = medication.description {
        println!("  {}", description);
    }
    println!(
        "  Schedule: {} per {} from {}, {} doses total",
        medication.schedule.frequency,
        cadence_unit(medication.schedule.kind),
        medication.schedule.start_date,
        medication.quantity
    );
    if let Some(ref rx) = medication.rx_number {
        println!("  Rx: {}", rx);
    }
    println!(
        "  Status: {}",
        if medication.is_active { "active" } else { "inactive" }
    );
    println!("  id: {}", medication.id);
    println!();
}
