use crate::db::stats::StatsQuery;
use crate::domain::listing::PostType;
use crate::domain::region::RegionLevel;
use crate::stats::engine::StatsRow;
use crate::stats::filters::{FurnishedFilter, Measure, PropertyFilter};
use crate::templates::desktop_layout;
use maud::{html, Markup};

pub struct StatsVm {
    pub query: StatsQuery,
    pub rows: Vec<StatsRow>,
}

pub fn stats_page(vm: &StatsVm) -> Markup {
    desktop_layout(
        "Statistics",
        html! {
            main class="container" {
                h1 { "Listing statistics" }

                (filter_form(&vm.query))

                div class="card" {
                    h3 {
                        (vm.query.value.as_str()) " per "
                        (vm.query.resolution.as_str()) ", "
                        (vm.query.post_type.as_str()) " / "
                        (vm.query.property_type.as_str())
                        @if let Some(f) = vm.query.furnished {
                            " / " (f.as_str())
                        }
                    }
                    div style="overflow-x: auto;" {
                        table style="width: 100%; border-collapse: collapse; font-size: 0.9em;" {
                            thead {
                                tr {
                                    (header_cell("Region"))
                                    (header_cell("n"))
                                    (header_cell("Median"))
                                    (header_cell("Q1"))
                                    (header_cell("Q3"))
                                    (header_cell("Mode"))
                                    (header_cell("Geo mean"))
                                    (header_cell("Geo std"))
                                    (header_cell("95% CI"))
                                }
                            }
                            tbody {
                                @for row in &vm.rows {
                                    tr {
                                        (body_cell(html! { (region_label(row)) }))
                                        (body_cell(html! { (row.number_of_properties) }))
                                        (body_cell(html! { (num(row.median)) }))
                                        (body_cell(html! { (num(row.q1)) }))
                                        (body_cell(html! { (num(row.q3)) }))
                                        (body_cell(html! { (num(row.mode)) }))
                                        (body_cell(html! { (num(row.geometric_mean)) }))
                                        (body_cell(html! { (num(row.geometric_std)) }))
                                        (body_cell(html! {
                                            (num(row.geometric_conf_int_95_low))
                                            " to "
                                            (num(row.geometric_conf_int_95_upp))
                                        }))
                                    }
                                }
                            }
                        }
                    }
                    @if vm.rows.is_empty() {
                        p { "No statistics for this combination yet. Run a statistics sweep first." }
                    }
                }
            }
        },
    )
}

fn filter_form(query: &StatsQuery) -> Markup {
    let select_style = "padding: 8px; border-radius: 4px; border: 1px solid #ccc;";
    html! {
        div class="card" {
            h3 { "Filters" }
            form action="/stats" method="get" style="display: flex; gap: 10px; align-items: center; flex-wrap: wrap;" {
                select name="resolution" style=(select_style) {
                    @for level in RegionLevel::ALL {
                        option value=(level.as_str()) selected[query.resolution == level] { (level.as_str()) }
                    }
                }
                select name="post_type" style=(select_style) {
                    @for post_type in [PostType::Buy, PostType::Rent] {
                        option value=(post_type.as_str()) selected[query.post_type == post_type] { (post_type.as_str()) }
                    }
                }
                select name="property_type" style=(select_style) {
                    @for filter in PropertyFilter::ALL {
                        option value=(filter.as_str()) selected[query.property_type == filter] { (filter.as_str()) }
                    }
                }
                @if query.post_type == PostType::Rent {
                    select name="furnished" style=(select_style) {
                        @for filter in FurnishedFilter::ALL {
                            option value=(filter.as_str()) selected[query.furnished == Some(filter)] { (filter.as_str()) }
                        }
                    }
                }
                select name="value" style=(select_style) {
                    @for measure in Measure::ALL {
                        option value=(measure.as_str()) selected[query.value == measure] { (measure.as_str()) }
                    }
                }
                button type="submit" style="padding: 8px 16px; background: #3b82f6; color: white; border: none; border-radius: 4px; cursor: pointer;" {
                    "Apply"
                }
            }
        }
    }
}

/// The display name at the row's own resolution: the deepest tag the sweep
/// filled in.
fn region_label(row: &StatsRow) -> &str {
    row.buurt
        .as_deref()
        .or(row.wijk.as_deref())
        .or(row.subdivision.as_deref())
        .or(row.stadsdeel.as_deref())
        .unwrap_or("")
}

fn num(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.2}"),
        None => "-".to_string(),
    }
}

fn header_cell(label: &str) -> Markup {
    html! {
        th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { (label) }
    }
}

fn body_cell(content: Markup) -> Markup {
    html! {
        td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (content) }
    }
}
