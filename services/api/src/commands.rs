use clap::Args;
use focus_engine::config::AppConfig;
use focus_engine::error::AppError;
use focus_engine::focus_areas::{
    classify_configured, classify_fixed, legend, select_top_level, EvaluationConfig,
    EvaluationDraft, EvaluationField, FocusArea, FocusAreaCoordinator, FocusAreaId,
    HttpFocusAreaApi, LegendBand, ProgramId, ThresholdRanges,
};
use focus_engine::telemetry;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Evaluation settings given on the command line; omitted fields take the defaults.
#[derive(Args, Debug, Default)]
pub(crate) struct ThresholdArgs {
    /// Lowest score on the scale
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) min: Option<i32>,
    /// Highest score on the scale
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) max: Option<i32>,
    /// Upper bound of the Poor band
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) t1: Option<i32>,
    /// Upper bound of the Fair band
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) t2: Option<i32>,
    /// Upper bound of the Good band
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) t3: Option<i32>,
}

impl ThresholdArgs {
    fn is_empty(&self) -> bool {
        [self.min, self.max, self.t1, self.t2, self.t3]
            .iter()
            .all(Option::is_none)
    }

    fn draft(&self) -> EvaluationDraft {
        let defaults = EvaluationConfig::default();
        EvaluationDraft {
            min_score: Some(self.min.unwrap_or(defaults.min_score)),
            max_score: Some(self.max.unwrap_or(defaults.max_score)),
            threshold1: Some(self.t1.unwrap_or(defaults.threshold1)),
            threshold2: Some(self.t2.unwrap_or(defaults.threshold2)),
            threshold3: Some(self.t3.unwrap_or(defaults.threshold3)),
        }
    }

    fn config(&self) -> Result<EvaluationConfig, AppError> {
        let draft = self.draft();
        let errors = draft.validate();
        if !errors.is_empty() {
            return Err(AppError::Usage(format!("invalid thresholds: {errors}")));
        }
        draft
            .to_config(None)
            .ok_or_else(|| AppError::Usage("thresholds are incomplete".to_string()))
    }
}

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Score to classify
    #[arg(allow_negative_numbers = true)]
    pub(crate) score: f64,
    #[command(flatten)]
    pub(crate) thresholds: ThresholdArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ValidateArgs {
    #[command(flatten)]
    pub(crate) thresholds: ThresholdArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SyncArgs {
    /// Program to reconcile (defaults to PORTAL_PROGRAM_ID)
    #[arg(long)]
    pub(crate) program: Option<String>,
    /// Override PORTAL_API_URL
    #[arg(long)]
    pub(crate) portal_url: Option<String>,
    /// Print the reconciled collections as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let ClassifyArgs { score, thresholds } = args;

    let fixed = classify_fixed(score);
    println!(
        "Score {score}: {} on the fixed scale (weight {}, {})",
        fixed.label(),
        fixed.weight(),
        fixed.color()
    );

    if thresholds.is_empty() {
        return Ok(());
    }

    let config = thresholds.config()?;
    let configured = classify_configured(score, &config);
    println!("Against thresholds: {}", configured.label());
    println!("Legend");
    for band in legend(&config) {
        println!("- {}", band.describe());
    }
    Ok(())
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let draft = args.thresholds.draft();
    let errors = draft.validate();
    let ranges = ThresholdRanges::compute(&draft);

    let value = |field| draft.get(field).unwrap_or_default();
    println!(
        "Scale {} to {}, thresholds {} / {} / {}",
        value(EvaluationField::MinScore),
        value(EvaluationField::MaxScore),
        value(EvaluationField::Threshold1),
        value(EvaluationField::Threshold2),
        value(EvaluationField::Threshold3),
    );

    println!("\nLegal ranges");
    for field in EvaluationField::ordered()
        .into_iter()
        .filter(|field| field.is_threshold())
    {
        if let Some(range) = ranges.get(field) {
            println!("- {}: {} to {}", field.label(), range.min, range.max);
        }
    }

    if errors.is_empty() {
        println!("\nSettings are valid");
        return Ok(());
    }

    println!("\nValidation errors");
    for (field, message) in errors.iter() {
        println!("- {}: {}", field.label(), message);
    }
    Err(AppError::Usage(format!(
        "{} evaluation setting(s) are invalid",
        errors.len()
    )))
}

pub(crate) async fn run_sync(args: SyncArgs) -> Result<(), AppError> {
    let SyncArgs {
        program,
        portal_url,
        json: as_json,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(url) = portal_url {
        config.portal.base_url = url;
    }
    let program_id = program
        .map(ProgramId)
        .or_else(|| config.portal.program_id.clone())
        .ok_or_else(|| {
            AppError::Usage("no program given; pass --program or set PORTAL_PROGRAM_ID".to_string())
        })?;

    telemetry::init(&config.telemetry, config.environment)?;

    let api = HttpFocusAreaApi::from_config(&config.portal)?;
    info!(portal = api.base_url(), %program_id, "reconciling focus areas");
    let coordinator = FocusAreaCoordinator::new(Arc::new(api), program_id.clone());
    coordinator.refresh().await?;

    let areas = coordinator.all_focus_areas();
    let selected = coordinator.selected_ids();
    if as_json {
        let payload = json!({
            "programId": program_id,
            "focusAreas": areas,
            "selected": selected,
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => println!("Focus area payload unavailable: {err}"),
        }
    } else {
        render_tree(&program_id, &areas, &selected);
    }
    Ok(())
}

fn render_tree(program_id: &ProgramId, areas: &[FocusArea], selected: &[FocusAreaId]) {
    println!(
        "Program {program_id}: {} of {} parent focus areas selected",
        selected.len(),
        select_top_level(areas).len()
    );

    if areas.is_empty() {
        println!("No focus areas defined");
        return;
    }

    for area in areas {
        let selected_mark = match &area.id {
            Some(id) if selected.contains(id) => "[x]",
            _ => "[ ]",
        };
        println!("{selected_mark} {}", describe(area));
        if let Some(line) = legend_line(area) {
            println!("      {line}");
        }
        for child in &area.children {
            println!("    - {}", describe(child));
            if let Some(line) = legend_line(child) {
                println!("        {line}");
            }
        }
    }
}

fn describe(area: &FocusArea) -> String {
    match &area.id {
        Some(id) => format!("{} ({id})", area.name),
        None => area.name.clone(),
    }
}

fn legend_line(area: &FocusArea) -> Option<String> {
    let config = area.eval.as_ref()?;
    Some(
        legend(config)
            .iter()
            .map(LegendBand::describe)
            .collect::<Vec<_>>()
            .join(" | "),
    )
}
