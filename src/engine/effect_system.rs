use crate::constants::get_effect_config;
use crate::types::{ActiveEffect, EffectType};

/// Adds an effect of `effect_type`; non-stackable types replace any
/// running instance of the same type.
pub fn apply_effect(
    active_effects: &mut Vec<ActiveEffect>,
    effect_type: EffectType,
    id: String,
    now_ms: u64,
) {
    let config = get_effect_config(effect_type);
    if !config.stackable {
        active_effects.retain(|effect| effect.effect_type != effect_type);
    }
    active_effects.push(ActiveEffect {
        id,
        effect_type,
        start_time: now_ms,
        duration_ms: config.duration_ms,
        value: config.value,
    });
}

pub fn expire_effects(active_effects: &mut Vec<ActiveEffect>, now_ms: u64) {
    active_effects.retain(|effect| effect.is_alive(now_ms));
}

/// Tick interval in ms: `base / product(speed boost values)`.
pub fn calculate_game_speed(base_speed_ms: f64, active_effects: &[ActiveEffect]) -> f64 {
    let multiplier: f64 = active_effects
        .iter()
        .filter(|effect| effect.effect_type == EffectType::SpeedBoost)
        .map(|effect| effect.value)
        .product();
    base_speed_ms / multiplier
}
