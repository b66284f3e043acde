use crate::model::{PipelineEvent, ResultValue, Stage};
use crate::report::{self, RenderModel};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// What the UI thread knows about the pipeline, rebuilt from controller events.
pub struct UiState {
    pub tab: usize,
    pub info: String,

    // Input as the user is editing it; sent along with every stage request.
    pub url: String,
    pub use_selenium: bool,
    pub editing: bool,

    pub busy: bool,
    pub active_stage: Option<Stage>,
    pub result: Option<ResultValue>,
    /// Stage that produced `result`; a later failed stage does not change it.
    pub result_stage: Option<Stage>,
    pub view: Option<RenderModel>,
    pub completed_at: Option<String>,
    pub has_enhanced_text: bool,
    pub scroll: u16,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            url: String::new(),
            use_selenium: false,
            editing: false,
            busy: false,
            active_stage: None,
            result: None,
            result_stage: None,
            view: None,
            completed_at: None,
            has_enhanced_text: false,
            scroll: 0,
        }
    }
}

impl UiState {
    pub fn apply_event(&mut self, ev: PipelineEvent) {
        match ev {
            PipelineEvent::StageStarted { stage } => {
                self.busy = true;
                self.active_stage = Some(stage);
                self.info = format!("Running {}…", stage.title());
            }
            PipelineEvent::StageCompleted {
                stage,
                result,
                completed_at,
            } => {
                self.busy = false;
                if stage == Stage::EnhanceText {
                    self.has_enhanced_text =
                        matches!(result.as_ref(), ResultValue::Text(t) if !t.is_empty());
                }
                self.view = Some(report::project(&result));
                self.result = Some(*result);
                self.result_stage = Some(stage);
                self.info = format!("{} completed at {}", stage.title(), completed_at);
                self.completed_at = Some(completed_at);
                self.scroll = 0;
            }
            PipelineEvent::StageFailed { stage, message } => {
                // The previous result stays on screen.
                self.busy = false;
                self.info = format!("{} failed: {}", stage.title(), message);
            }
            PipelineEvent::Rejected { stage, message } => {
                self.info = format!("{} not started: {}", stage.title(), message);
            }
            PipelineEvent::Info(msg) => self.info = msg,
        }
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let next = (self.scroll as i32 + delta).clamp(0, u16::MAX as i32);
        self.scroll = next as u16;
    }

    /// Heading for the result panel, e.g. `Result: ANALYZE`.
    pub fn result_title(&self) -> String {
        match (self.busy, self.active_stage, self.result_stage) {
            (true, Some(stage), _) => format!("Result (running {}…)", stage.title()),
            (_, _, Some(stage)) => format!("Result: {}", stage.as_id().to_uppercase()),
            _ => "Result".into(),
        }
    }
}

/// Styled lines for the result panel.
pub fn view_lines(view: &RenderModel) -> Vec<Line<'static>> {
    match view {
        RenderModel::Block { text } => text.lines().map(|l| Line::from(l.to_string())).collect(),
        RenderModel::Report(r) => {
            let mut out = Vec::new();
            let heading = Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD);
            for section in &r.sections {
                out.push(Line::from(Span::styled(section.label, heading)));
                for field in &section.fields {
                    push_field(&mut out, field.label, field.value.as_deref());
                }
                out.push(Line::from(""));
            }
            if !r.notes.is_empty() {
                out.push(Line::from(Span::styled("Notes", heading)));
                for field in &r.notes {
                    push_field(&mut out, field.label, field.value.as_deref());
                }
            }
            out
        }
    }
}

fn push_field(out: &mut Vec<Line<'static>>, label: &str, value: Option<&str>) {
    out.push(Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{label}: "), Style::default().fg(Color::Gray)),
        Span::raw(value.unwrap_or("-").to_string()),
    ]));
}
