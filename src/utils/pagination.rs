use serde::{Deserialize, Deserializer, Serialize};

pub const MESSAGES_PER_PAGE: i64 = 50;
pub const ROOMS_PER_PAGE: i64 = 20;

/// Where a requested page lands once the total item count is known.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    #[serde(skip)]
    pub offset: i64,
    #[serde(skip)]
    pub limit: i64,
}

/// Which page to fall back to when none was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPage {
    First,
    Last,
}

/// Reads a `?page=` query value. Anything that is not an integer asks for
/// the first page instead of failing the request.
pub fn lenient_page<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|value| value.trim().parse().unwrap_or(1)))
}

/// Resolves a requested page number against `total` items.
///
/// There is always at least one (possibly empty) page. A page past the end,
/// or below 1, resolves to the last page.
pub fn resolve_page(requested: Option<i64>, total: i64, per_page: i64, default: DefaultPage) -> PageInfo {
    let total = total.max(0);
    let num_pages = ((total + per_page - 1) / per_page).max(1);

    let number = match requested {
        Some(n) if n >= 1 && n <= num_pages => n,
        Some(_) => num_pages,
        None => match default {
            DefaultPage::First => 1,
            DefaultPage::Last => num_pages,
        },
    };

    PageInfo {
        number,
        num_pages,
        total,
        offset: (number - 1) * per_page,
        limit: per_page,
    }
}
