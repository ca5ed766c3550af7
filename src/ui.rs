// src/ui.rs
use egui;

use crate::engine_lib::config::{BlobControls, SECTION_LABELS};

/// What the overlay asked for this frame.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct UiOutput {
    pub controls: Option<BlobControls>,
    pub section: Option<usize>,
}

pub fn build_ui(ctx: &egui::Context, controls: &BlobControls, current_section: usize) -> UiOutput {
    let mut output = UiOutput::default();
    let mut edited = *controls;

    egui::Window::new("Blob controls")
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
        .resizable(false)
        .default_open(true)
        .show(ctx, |ui| {
            ui.vertical(|ui| {
                let mut changed = false;
                changed |= ui.add(egui::Slider::new(&mut edited.movement_speed, 0.0..=3.0).text("Movement speed")).changed();
                changed |= ui
                    .add(egui::Slider::new(&mut edited.random_direction_factor, 0.0..=3.0).text("Random direction"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut edited.jiggle_intensity, 0.0..=BlobControls::MAX_JIGGLE).text("Jiggle"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut edited.avoidance_distance, 0.0..=4.0).text("Avoidance distance"))
                    .changed();
                changed |= ui.add(egui::Slider::new(&mut edited.rotation_speed, 0.0..=3.0).text("Rotation speed")).changed();
                if ui.button("Reset").clicked() {
                    edited = BlobControls::default();
                    changed = true;
                }
                if changed {
                    output.controls = Some(edited);
                }

                ui.separator();
                ui.label("Sections");
                ui.horizontal_wrapped(|ui| {
                    for (index, label) in SECTION_LABELS.iter().enumerate() {
                        if ui.selectable_label(index == current_section, *label).clicked() {
                            output.section = Some(index);
                        }
                    }
                });
            });
        });

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_frame_requests_nothing() {
        let ctx = egui::Context::default();
        let mut output = UiOutput::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            output = build_ui(ctx, &BlobControls::default(), 0);
        });
        assert_eq!(output, UiOutput::default());
    }
}
