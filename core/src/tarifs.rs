use rust_decimal::Decimal;

/// Official pricing tuple for a (site, dimension) plan. Plain decimal
/// amounts; currency formatting is a presentation concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanRates {
    pub total: Decimal,
    pub down_payment: Decimal,
    pub monthly_installment: Decimal,
}

impl PlanRates {
    pub const ZERO: PlanRates = PlanRates {
        total: Decimal::ZERO,
        down_payment: Decimal::ZERO,
        monthly_installment: Decimal::ZERO,
    };
}

// (site, dimension, total, down payment, monthly installment)
const OFFICIAL_TARIFFS: [(&str, &str, u32, u32, u32); 4] = [
    ("NDJILI BRASSERIE", "15x20", 800, 80, 32),
    ("NDJILI BRASSERIE", "20x20", 2500, 150, 100),
    ("KINGAKATI", "15x20", 1000, 100, 40),
    ("KINGAKATI", "20x20", 1500, 200, 65),
];

/// Looks up the pricing tuple for a plan. Unknown or empty site/dimension
/// resolves to the zero tuple so the form can render before a plan is
/// chosen; this never fails.
pub fn resolve(site: &str, dimension: &str) -> PlanRates {
    OFFICIAL_TARIFFS
        .iter()
        .find(|(table_site, table_dimension, ..)| {
            *table_site == site && *table_dimension == dimension
        })
        .map(|(_, _, total, down_payment, monthly)| PlanRates {
            total: Decimal::from(*total),
            down_payment: Decimal::from(*down_payment),
            monthly_installment: Decimal::from(*monthly),
        })
        .unwrap_or(PlanRates::ZERO)
}

pub fn sites() -> Vec<String> {
    let mut sites = Vec::new();
    for (site, ..) in OFFICIAL_TARIFFS {
        if !sites.contains(&site.to_string()) {
            sites.push(site.to_string());
        }
    }
    sites
}

pub fn dimensions(site: &str) -> Vec<String> {
    OFFICIAL_TARIFFS
        .iter()
        .filter(|(table_site, ..)| *table_site == site)
        .map(|(_, dimension, ..)| dimension.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_plan() {
        let rates = resolve("NDJILI BRASSERIE", "15x20");
        assert_eq!(rates.total, Decimal::from(800));
        assert_eq!(rates.down_payment, Decimal::from(80));
        assert_eq!(rates.monthly_installment, Decimal::from(32));
    }

    #[test]
    fn unknown_site_or_dimension_is_zero() {
        assert_eq!(resolve("", "15x20"), PlanRates::ZERO);
        assert_eq!(resolve("LUBUMBASHI", "15x20"), PlanRates::ZERO);
        assert_eq!(resolve("KINGAKATI", "99x99"), PlanRates::ZERO);
        assert_eq!(resolve("KINGAKATI", ""), PlanRates::ZERO);
    }

    #[test]
    fn lists_sites_and_dimensions() {
        assert_eq!(sites(), vec!["NDJILI BRASSERIE", "KINGAKATI"]);
        assert_eq!(dimensions("KINGAKATI"), vec!["15x20", "20x20"]);
        assert!(dimensions("UNKNOWN").is_empty());
    }
}
