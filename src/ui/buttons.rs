use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton},
};

use crate::audio::now_playing::{Control, ControlButton};

fn style(control: Control) -> ButtonStyle {
    match control {
        Control::Pause | Control::Play => ButtonStyle::Primary,
        Control::Skip => ButtonStyle::Secondary,
        Control::Stop => ButtonStyle::Danger,
    }
}

fn emoji(control: Control) -> char {
    match control {
        Control::Pause => '⏸',
        Control::Play => '▶',
        Control::Skip => '⏭',
        Control::Stop => '⏹',
    }
}

/// Fila de controles del mensaje de "reproduciendo ahora"
pub fn create_player_controls(controls: &[ControlButton]) -> Vec<CreateActionRow> {
    let buttons = controls
        .iter()
        .map(|button| {
            CreateButton::new(button.control.custom_id())
                .label(button.control.label())
                .emoji(emoji(button.control))
                .style(style(button.control))
                .disabled(button.disabled)
        })
        .collect();

    vec![CreateActionRow::Buttons(buttons)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_row_with_every_control() {
        let controls: Vec<ControlButton> = Control::ALL
            .into_iter()
            .map(|control| ControlButton {
                control,
                disabled: true,
            })
            .collect();

        let rows = create_player_controls(&controls);
        assert_eq!(rows.len(), 1);

        let json = serde_json::to_string(&rows).unwrap();
        for control in Control::ALL {
            assert!(json.contains(&format!("\"custom_id\":\"{}\"", control.custom_id())));
        }
        assert!(!json.contains("\"disabled\":false"));
    }

    #[test]
    fn test_custom_ids_round_trip() {
        for control in Control::ALL {
            assert_eq!(Control::from_custom_id(control.custom_id()), Some(control));
        }
        assert_eq!(Control::from_custom_id("shuffle"), None);
    }
}
