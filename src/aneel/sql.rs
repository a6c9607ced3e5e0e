//! Query construction for the CKAN `datastore_search_sql` endpoint.
//!
//! The endpoint offers no parameter binding, so every interpolated value
//! goes through [`quote_literal`] here and nowhere else.

use chrono::NaiveDate;

use super::{RESOURCE_ID_BANDEIRAS, RESOURCE_ID_TARIFAS};

/// Escape and single-quote a string literal for embedding in a query.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Activated flag name for rows whose competency date starts with the
/// given year-month.
pub(crate) fn active_flag_query(month: NaiveDate) -> String {
    let pattern = format!("{}%", month.format("%Y-%m"));
    format!(
        "SELECT \"NomBandeiraAcionada\" FROM \"{RESOURCE_ID_BANDEIRAS}\" \
         WHERE \"DatCompetencia\" LIKE {} LIMIT 1",
        quote_literal(&pattern),
    )
}

/// Distinct provider codes across the tariff schedule resource.
pub(crate) fn provider_codes_query() -> String {
    format!("SELECT \"SigAgente\" FROM \"{RESOURCE_ID_TARIFAS}\" GROUP BY \"SigAgente\"")
}

/// Tariff components for a provider's residential conventional low-voltage
/// schedule (B1/Convencional) still valid past `as_of`.
pub(crate) fn base_tariff_query(provider: &str, as_of: NaiveDate) -> String {
    format!(
        "SELECT \"VlrTUSD\", \"VlrTE\" FROM \"{RESOURCE_ID_TARIFAS}\" \
         WHERE \"SigAgente\" = {provider} \
         AND \"DscBaseTarifaria\" = 'Tarifa de Aplicação' \
         AND \"DscSubGrupo\" = 'B1' \
         AND \"DscClasse\" = 'Residencial' \
         AND \"DscModalidadeTarifaria\" = 'Convencional' \
         AND \"DscSubClasse\" = 'Residencial' \
         AND \"DscDetalhe\" = 'Não se aplica' \
         AND \"DatFimVigencia\" > {as_of} \
         LIMIT 1",
        provider = quote_literal(provider),
        as_of = quote_literal(&as_of.format("%Y-%m-%d").to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_escapes_literals() {
        assert_eq!(quote_literal("CEMIG"), "'CEMIG'");
        assert_eq!(quote_literal("D'AVILA"), "'D''AVILA'");
    }

    #[test]
    fn active_flag_query_filters_by_month_prefix() {
        let month = NaiveDate::from_ymd_opt(2026, 8, 15).unwrap();
        let q = active_flag_query(month);
        assert!(q.contains("\"DatCompetencia\" LIKE '2026-08%'"));
        assert!(q.contains(RESOURCE_ID_BANDEIRAS));
        assert!(q.ends_with("LIMIT 1"));
    }

    #[test]
    fn base_tariff_query_pins_the_residential_schedule() {
        let as_of = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
        let q = base_tariff_query("CPFL Paulista", as_of);
        assert!(q.contains("\"SigAgente\" = 'CPFL Paulista'"));
        assert!(q.contains("\"DscSubGrupo\" = 'B1'"));
        assert!(q.contains("\"DscModalidadeTarifaria\" = 'Convencional'"));
        assert!(q.contains("\"DatFimVigencia\" > '2026-08-30'"));
    }

    #[test]
    fn provider_names_cannot_break_out_of_the_literal() {
        let as_of = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let q = base_tariff_query("x' OR '1'='1", as_of);
        assert!(q.contains("'x'' OR ''1''=''1'"));
    }
}
