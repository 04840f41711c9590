use crate::db::listings::WarehouseCounts;
use crate::db::scrapes::ScrapeRun;
use crate::templates::{components::card, desktop_layout};
use maud::{html, Markup};

pub struct HomeVm {
    pub counts: WarehouseCounts,
    pub scrapes: Vec<ScrapeRun>,
}

pub fn home_page(vm: &HomeVm) -> Markup {
    desktop_layout(
        "Woningmarkt",
        html! {
            main class="container" {
                h1 { "Woningmarkt" }

                (card("Warehouse", html! {
                    table style="width: 100%; border-collapse: collapse;" {
                        tbody {
                            (count_row("Listings", vm.counts.listings))
                            (count_row("Available", vm.counts.available))
                            (count_row("For sale", vm.counts.buy))
                            (count_row("For rent", vm.counts.rent))
                            (count_row("Assigned to a region", vm.counts.assigned))
                            (count_row("Consolidated regions", vm.counts.merged_buurten))
                            (count_row("Statistics rows", vm.counts.stats_rows))
                        }
                    }
                }))

                (card("Statistics", html! {
                    ul {
                        li { a href="/stats" { "Browse statistics" } }
                        li { a href="/stats.json" { "Statistics as JSON" } }
                        li { a href="/stats.xlsx" { "Download spreadsheet" } }
                        li { a href="/regions.json?level=buurt" { "Region polygons" } }
                    }
                }))

                div class="card" {
                    h3 { "Scraper Control" }
                    form action="/admin/scrape" method="post" style="margin-bottom: 1rem;" {
                        button type="submit" style="padding: 8px 16px; background: #10b981; color: white; border: none; border-radius: 4px; cursor: pointer;" {
                            "Start Scrape Job"
                        }
                    }

                    h4 { "Recent Runs" }
                    div style="overflow-x: auto;" {
                        table style="width: 100%; border-collapse: collapse; font-size: 0.9em;" {
                            thead {
                                tr {
                                    th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "ID" }
                                    th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Source" }
                                    th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Side" }
                                    th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Started" }
                                    th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Status" }
                                    th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Pages" }
                                    th style="padding: 8px; text-align: left; border-bottom: 2px solid #eee;" { "Found" }
                                }
                            }
                            tbody {
                                @for run in &vm.scrapes {
                                    tr {
                                        td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (run.id) }
                                        td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (run.page_source) }
                                        td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (run.post_type) }
                                        td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (format_epoch(run.started_at)) }
                                        td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" {
                                            @if run.finished_at.is_none() {
                                                span style="color: blue;" { "Running..." }
                                            } @else if run.success == Some(true) {
                                                span style="color: green;" { "Success" }
                                            } @else {
                                                span style="color: red;" { "Failed" }
                                                @if let Some(err) = &run.error_message {
                                                    br; span style="font-size: 0.8em; color: #666;" { (err) }
                                                }
                                            }
                                        }
                                        td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (run.pages_fetched.unwrap_or(0)) }
                                        td style="padding: 8px; border-bottom: 1px solid #f9f9f9;" { (run.listings_seen.unwrap_or(0)) }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

fn count_row(label: &str, n: i64) -> Markup {
    html! {
        tr {
            td style="padding: 8px; border-bottom: 1px solid #f3f4f6;" { (label) }
            td style="padding: 8px; border-bottom: 1px solid #f3f4f6; text-align: right;" { strong { (n) } }
        }
    }
}

fn format_epoch(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
