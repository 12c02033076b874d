// src/cli_dump.rs
//
// Betaflight CLI text for a recommendation, ready to paste into the configurator.

use crate::axis_names::Axis;
use crate::data_analysis::tuning_recommender::Recommendation;
use crate::data_input::pid_metadata::PidMetadata;

/// Order Betaflight lists the axes in its own `diff` output.
const CLI_AXIS_ORDER: [Axis; 3] = [Axis::Pitch, Axis::Roll, Axis::Yaw];

/// Renders the recommendation as Betaflight CLI commands.
///
/// Notch suggestions are emitted as comments: the firmware only offers two
/// static gyro notches and the pilot has to pick which to use.
pub fn render(recommendation: &Recommendation, flown: Option<&PidMetadata>) -> String {
    let mut cli = format!(
        "# blackbox_tune {} generated profile for Betaflight\n",
        crate::crate_version()
    );

    if let Some(flown) = flown.filter(|f| !f.is_empty()) {
        cli.push_str("# Flown gains:\n");
        for axis in Axis::ALL {
            let pid = flown.get_axis(axis);
            if !pid.is_empty() {
                cli.push_str(&format!("#   {axis}: {}\n", pid.summary(flown.firmware_type)));
            }
        }
    }
    cli.push('\n');

    let multiplier = (recommendation.filter_slider * 100.0).round() as u32;
    cli.push_str("# Simplified filter multipliers\n");
    cli.push_str(&format!("set simplified_gyro_filter_multiplier = {multiplier}\n"));
    cli.push_str(&format!("set simplified_dterm_filter_multiplier = {multiplier}\n\n"));

    for axis in CLI_AXIS_ORDER {
        let pid = recommendation.pids.get(axis);
        let key = axis.key();
        cli.push_str(&format!(
            "set p_{key} = {}\nset i_{key} = {}\nset d_{key} = {}\n\n",
            pid.p.round() as u32,
            pid.i.round() as u32,
            pid.d.round() as u32
        ));
    }

    if !recommendation.filters.is_empty() {
        cli.push_str("# Suggested notch filters\n");
        for filter in &recommendation.filters {
            cli.push_str(&format!(
                "# {} notch: center {} Hz, cutoff {} Hz\n",
                filter.axis, filter.center_hz, filter.cutoff_hz
            ));
        }
        cli.push('\n');
    }

    cli.push_str("save\n");
    cli
}
