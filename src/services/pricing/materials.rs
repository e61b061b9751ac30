//! Static material catalogue used by the film and quote calculators.

use once_cell::sync::Lazy;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// A film layer raw material priced per kilogram in KRW.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmMaterial {
    pub id: &'static str,
    pub name_ja: &'static str,
    /// g/cm³
    pub density: Decimal,
    /// KRW per kg
    pub price_per_kg: Decimal,
    /// Typical thickness in μm
    pub default_thickness: u32,
}

static FILM_MATERIALS: Lazy<HashMap<&'static str, FilmMaterial>> = Lazy::new(|| {
    [
        ("PET", "PET", dec!(1.40), dec!(2800), 12),
        ("AL", "アルミ", dec!(2.71), dec!(7800), 7),
        ("LLDPE", "LLDPE", dec!(0.92), dec!(2800), 80),
        ("NY", "ナイロン", dec!(1.16), dec!(5400), 15),
        ("VMPET", "VM PET", dec!(1.40), dec!(3600), 7),
    ]
    .into_iter()
    .map(|(id, name_ja, density, price_per_kg, default_thickness)| {
        (
            id,
            FilmMaterial {
                id,
                name_ja,
                density,
                price_per_kg,
                default_thickness,
            },
        )
    })
    .collect()
});

/// Looks up a film layer material. `PE` resolves to `LLDPE`.
pub fn film_material(id: &str) -> Option<&'static FilmMaterial> {
    let key = match id {
        "PE" => "LLDPE",
        other => other,
    };
    FILM_MATERIALS.get(key)
}

/// One layer of a laminated film structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct FilmLayer {
    pub material_id: String,
    /// μm
    pub thickness: u32,
}

impl FilmLayer {
    pub fn new(material_id: impl Into<String>, thickness: u32) -> Self {
        Self {
            material_id: material_id.into(),
            thickness,
        }
    }
}

/// PET 12μ / AL 7μ / LLDPE 80μ.
pub fn default_layers() -> Vec<FilmLayer> {
    vec![
        FilmLayer::new("PET", 12),
        FilmLayer::new("AL", 7),
        FilmLayer::new("LLDPE", 80),
    ]
}

/// Material as priced by the unified quote engine (JPY per kg).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteMaterial {
    pub id: &'static str,
    pub cost_per_kg: Decimal,
    pub density_rate: Decimal,
}

static QUOTE_MATERIALS: Lazy<HashMap<&'static str, QuoteMaterial>> = Lazy::new(|| {
    [
        ("opp-alu-foil", dec!(1200), dec!(2.5)),
        ("kraft-pe", dec!(380), dec!(0.85)),
        ("alu-vapor", dec!(900), dec!(2.0)),
        ("pet-transparent", dec!(450), dec!(1.4)),
        ("PET", dec!(450), dec!(1.38)),
        ("PP", dec!(300), dec!(0.90)),
        ("PE", dec!(250), dec!(0.92)),
        ("ALUMINUM", dec!(1200), dec!(2.70)),
        ("PAPER_LAMINATE", dec!(380), dec!(0.80)),
    ]
    .into_iter()
    .map(|(id, cost_per_kg, density_rate)| {
        (
            id,
            QuoteMaterial {
                id,
                cost_per_kg,
                density_rate,
            },
        )
    })
    .collect()
});

/// Unknown material ids are priced as `PET`.
pub fn quote_material(id: &str) -> QuoteMaterial {
    QUOTE_MATERIALS
        .get(id)
        .or_else(|| QUOTE_MATERIALS.get("PET"))
        .copied()
        .unwrap_or(QuoteMaterial {
            id: "PET",
            cost_per_kg: dec!(450),
            density_rate: dec!(1.38),
        })
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThicknessSelection {
    Light,
    #[default]
    Medium,
    Heavy,
    Ultra,
}

impl ThicknessSelection {
    /// Unknown or missing selections are treated as `medium`.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }

    pub fn microns(&self) -> u32 {
        match self {
            ThicknessSelection::Light => 60,
            ThicknessSelection::Medium => 80,
            ThicknessSelection::Heavy => 100,
            ThicknessSelection::Ultra => 120,
        }
    }

    /// Scales the sealant layer when pricing by film composition.
    pub fn multiplier(&self) -> Decimal {
        match self {
            ThicknessSelection::Light => dec!(0.9),
            ThicknessSelection::Medium => dec!(1.0),
            ThicknessSelection::Heavy => dec!(1.1),
            ThicknessSelection::Ultra => dec!(1.2),
        }
    }
}

/// Japanese display name of a thickness option offered for a catalogue material.
pub fn thickness_display_name(material_id: &str, selection: &str) -> Option<&'static str> {
    let selection: ThicknessSelection = selection.parse().ok()?;
    use ThicknessSelection::*;
    let name = match (material_id, selection) {
        ("opp-alu-foil" | "alu-vapor", Light) => "軽量タイプ (~100g)",
        ("opp-alu-foil" | "alu-vapor" | "kraft-pe", Medium) => "標準タイプ (~500g)",
        ("opp-alu-foil" | "alu-vapor" | "kraft-pe", Heavy) => "高耐久タイプ (~800g)",
        ("opp-alu-foil", Ultra) => "超耐久タイプ (800g~)",
        ("kraft-pe", Light) => "軽量タイプ (~200g)",
        ("pet-transparent", Light) => "薄肉タイプ (~50g)",
        ("pet-transparent", Medium) => "標準タイプ (~300g)",
        ("pet-transparent", Heavy) => "高耐久タイプ (~600g)",
        _ => return None,
    };
    Some(name)
}

/// Applies a thickness selection to the LLDPE/PE sealant layers, rounding to whole microns.
pub fn adjust_layers_for_thickness(
    layers: &[FilmLayer],
    selection: ThicknessSelection,
) -> Vec<FilmLayer> {
    let multiplier = selection.multiplier();
    if multiplier == Decimal::ONE {
        return layers.to_vec();
    }
    layers
        .iter()
        .map(|layer| {
            if layer.material_id == "LLDPE" || layer.material_id == "PE" {
                let scaled = super::round_half_up(Decimal::from(layer.thickness) * multiplier);
                FilmLayer {
                    material_id: layer.material_id.clone(),
                    thickness: scaled.to_u32().unwrap_or(layer.thickness),
                }
            } else {
                layer.clone()
            }
        })
        .collect()
}
