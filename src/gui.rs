use crate::libmondai::ai::DashScopeClient;
use crate::libmondai::gazou::{self, Preview};
use crate::libmondai::kotae::AnswerArea;
use crate::libmondai::mondai::Problem;
use crate::libmondai::sagyou::{AiFill, AiFillOutcome};
use crate::libmondai::settei::AiSettings;
use crate::Error;
use eframe::egui;
use eframe::egui::Align2;
use eframe::egui::FontData;
use eframe::egui::RichText;
use eframe::egui::ScrollArea;
use eframe::egui::TextEdit;
use eframe::egui::TextureHandle;
use eframe::egui::TextureOptions;
use eframe::egui::Ui;
use eframe::epaint::text::FontInsert;
use eframe::epaint::text::InsertFontFamily;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::path::Path;

const AI_IDLE_LABEL: &str = "AI answer";
const AI_BUSY_LABEL: &str = "AI thinking...";

#[derive(Debug)]
struct Notice {
    title: &'static str,
    message: String,
    close_after: bool,
}

/// Pending notices plus the confirm/close lifecycle of the dialog. Notices
/// queue up so a late one never hides the "saved" notice that closes the
/// dialog, and nothing undoes a confirm.
#[derive(Debug, Default)]
struct DialogFlow {
    notices: VecDeque<Notice>,
    confirmed: bool,
    closing: bool,
}

impl DialogFlow {
    fn notify(&mut self, title: &'static str, message: String) {
        self.notices.push_back(Notice {
            title,
            message,
            close_after: false,
        });
    }

    fn current(&self) -> Option<&Notice> {
        self.notices.front()
    }

    fn is_blocked(&self) -> bool {
        !self.notices.is_empty()
    }

    /// Once the answers are committed, AI replies have nowhere to go.
    fn accepts_ai_results(&self) -> bool {
        !self.confirmed
    }

    fn confirm(&mut self) -> bool {
        if self.confirmed {
            return false;
        }
        self.confirmed = true;
        self.notices.push_back(Notice {
            title: "Notice",
            message: String::from("Answers saved"),
            close_after: true,
        });
        true
    }

    fn cancel(&mut self) {
        if self.confirmed {
            debug!("[Setup] Already confirmed, ignoring cancel");
            return;
        }
        self.closing = true;
    }

    fn acknowledge(&mut self) {
        if let Some(notice) = self.notices.pop_front() {
            self.closing |= notice.close_after;
        }
    }
}

enum ImageView {
    Texture(TextureHandle),
    Text(String),
}

struct GuiState<'a> {
    problem: &'a mut Problem,
    confirmed: &'a mut bool,
    area: Option<AnswerArea>,
    ai: AiFill<DashScopeClient>,
    api_key: String,
    image: ImageView,

    flow: DialogFlow,
}

impl<'a> GuiState<'a> {
    fn new(
        ctx: &eframe::CreationContext,
        problem: &'a mut Problem,
        confirmed: &'a mut bool,
        settings: AiSettings,
        client: DashScopeClient,
        font: Option<&Path>,
    ) -> Self {
        if let Some(font) = font {
            add_font(ctx, font);
        }

        let image = match gazou::load_preview(problem.image_path()) {
            Preview::Fitted(img) => {
                let size = [img.width() as usize, img.height() as usize];
                let color = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
                ImageView::Texture(ctx.egui_ctx.load_texture(
                    "problem_image",
                    color,
                    TextureOptions::LINEAR,
                ))
            }
            Preview::Placeholder(text) => ImageView::Text(text),
        };

        Self {
            area: AnswerArea::for_problem(problem),
            problem,
            confirmed,
            ai: AiFill::new(client),
            api_key: settings.api_key,
            image,

            flow: DialogFlow::default(),
        }
    }

    fn on_ai_answer_click(&mut self, ctx: &egui::Context) {
        let waker = ctx.clone();
        let started = self.ai.start(&self.api_key, self.problem.image_path(), move || {
            waker.request_repaint()
        });
        if let Err(err) = started {
            debug!("[AI] Not started: {}", err);
            self.flow.notify("Notice", err.to_string());
        }
    }

    fn on_confirm_click(&mut self) {
        if !self.flow.confirm() {
            return;
        }
        self.problem.commit_answers(self.area.as_ref());
        *self.confirmed = true;
        info!("[Answer] Saved {:?}", self.problem.answers);
    }

    fn poll_ai(&mut self) {
        if !self.flow.accepts_ai_results() {
            return;
        }
        if let Some(outcome) = self.ai.poll(self.area.as_mut()) {
            let title = match outcome {
                AiFillOutcome::Filled(_) | AiFillOutcome::NoUsableAnswer => "Notice",
                AiFillOutcome::ParseFailed(_) | AiFillOutcome::CallFailed(_) => "Error",
            };
            self.flow.notify(title, outcome.notice());
            self.ai.reset();
        }
    }

    fn draw_body(&self, ui: &mut Ui) {
        ui.label(RichText::new("Problem:").strong().size(16.0));
        let body = self.problem.body.as_deref().unwrap_or("No problem text");
        ui.label(RichText::new(body).size(14.0));
    }

    fn draw_image(&self, ui: &mut Ui) {
        ui.label(RichText::new("Problem image:").strong().size(16.0));
        match &self.image {
            ImageView::Texture(texture) => {
                ui.add(egui::Image::new((texture.id(), texture.size_vec2())));
            }
            ImageView::Text(text) => {
                ui.label(text);
            }
        }
    }

    fn draw_ai_row(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("AI answering:").strong().size(16.0));
        let busy = self.ai.is_requesting();
        let mut clicked = false;
        ui.horizontal(|ui| {
            ui.label("AI Key:");
            let field_width = (ui.available_width() - 120.0).max(100.0);
            ui.add(
                TextEdit::singleline(&mut self.api_key)
                    .password(true)
                    .desired_width(field_width),
            );
            let label = if busy { AI_BUSY_LABEL } else { AI_IDLE_LABEL };
            clicked = ui.add_enabled(!busy, egui::Button::new(label)).clicked();
        });
        if clicked {
            self.on_ai_answer_click(ui.ctx());
        }
    }

    fn draw_answer_area(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Your answer:").strong().size(16.0));
        match &mut self.area {
            Some(AnswerArea::Radio(group)) => {
                let (options, selected) = group.parts_mut();
                for option in options {
                    ui.radio_value(selected, option.key.clone(), option.label());
                }
            }
            Some(AnswerArea::Checkbox(group)) => {
                for (option, checked) in group.entries_mut() {
                    ui.checkbox(checked, option.label());
                }
            }
            Some(AnswerArea::Fill(fields)) => {
                for (i, field) in fields.fields_mut().iter_mut().enumerate() {
                    ui.horizontal(|ui| {
                        ui.label(format!("Blank {}:", i + 1));
                        ui.add(TextEdit::singleline(field).desired_width(f32::INFINITY));
                    });
                }
            }
            None => {}
        }
    }

    fn draw_notice(&mut self, ctx: &egui::Context) {
        let mut acknowledged = false;
        if let Some(notice) = self.flow.current() {
            egui::Window::new(notice.title)
                .collapsible(false)
                .resizable(false)
                .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(&notice.message);
                    if ui.button("OK").clicked() {
                        acknowledged = true;
                    }
                });
        }
        if acknowledged {
            self.flow.acknowledge();
        }
    }
}

fn add_font(ctx: &eframe::CreationContext, path: &Path) {
    match std::fs::read(path) {
        Ok(bytes) => {
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| String::from("custom"));
            ctx.egui_ctx.add_font(FontInsert::new(
                &name,
                FontData::from_owned(bytes),
                vec![InsertFontFamily {
                    family: egui::FontFamily::Proportional,
                    priority: egui::epaint::text::FontPriority::Highest,
                }],
            ));
            debug!("[Setup] Added font {}", name);
        }
        Err(err) => warn!("[Setup] Cannot read font {:?}: {}", path, err),
    }
}

impl eframe::App for GuiState<'_> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_ai();

        let enabled = !self.flow.is_blocked();
        let mut confirm = false;
        let mut cancel = false;

        egui::TopBottomPanel::bottom("dialog_buttons").show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    cancel = ui.add(egui::Button::new("Cancel").min_size([120.0, 0.0].into())).clicked();
                    confirm = ui.add(egui::Button::new("Confirm").min_size([120.0, 0.0].into())).clicked();
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(enabled, |ui| {
                ScrollArea::both().auto_shrink(false).show(ui, |ui| {
                    self.draw_body(ui);
                    ui.separator();
                    self.draw_image(ui);
                    ui.separator();
                    self.draw_ai_row(ui);
                    ui.separator();
                    self.draw_answer_area(ui);
                });
            });
        });

        if confirm {
            self.on_confirm_click();
        } else if cancel {
            debug!("[Setup] Cancelled");
            self.flow.cancel();
        }

        self.draw_notice(ctx);

        if self.flow.closing {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

/// Runs the dialog until it is closed. Returns whether the user confirmed,
/// in which case `problem.answers` has been replaced.
pub fn init_gui(
    problem: &mut Problem,
    settings: AiSettings,
    font: Option<&Path>,
) -> Result<bool, Error> {
    let client = DashScopeClient::new(&settings.model, &settings.base_url, settings.timeout)?;
    let title = format!("Problem detail - page: {}", problem.page_label());
    let mut confirmed = false;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([500.0, 400.0]),
        ..Default::default()
    };
    eframe::run_native(
        &title,
        native_options,
        Box::new(|cc| {
            Ok(Box::new(GuiState::new(
                cc,
                problem,
                &mut confirmed,
                settings,
                client,
                font,
            )))
        }),
    )?;

    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_notice_closes_after_acknowledge() {
        let mut flow = DialogFlow::default();
        assert!(flow.confirm());
        assert!(flow.is_blocked());
        assert!(!flow.closing);

        flow.acknowledge();
        assert!(flow.closing);
        assert!(!flow.is_blocked());
    }

    #[test]
    fn earlier_notice_does_not_swallow_the_close() {
        let mut flow = DialogFlow::default();
        flow.notify("Notice", String::from("AI answering complete"));
        assert!(flow.confirm());
        assert_eq!(flow.current().unwrap().message, "AI answering complete");

        flow.acknowledge();
        assert!(!flow.closing);
        assert_eq!(flow.current().unwrap().message, "Answers saved");

        flow.acknowledge();
        assert!(flow.closing);
    }

    #[test]
    fn confirmed_dialog_ignores_ai_results_and_cancel() {
        let mut flow = DialogFlow::default();
        assert!(flow.accepts_ai_results());
        flow.confirm();

        assert!(!flow.accepts_ai_results());
        flow.cancel();
        assert!(flow.confirmed);
        assert!(!flow.closing);
        assert!(!flow.confirm());
        assert_eq!(flow.notices.len(), 1);
    }

    #[test]
    fn cancel_before_confirm_closes_without_saving() {
        let mut flow = DialogFlow::default();
        flow.cancel();
        assert!(flow.closing);
        assert!(!flow.confirmed);
    }
}
