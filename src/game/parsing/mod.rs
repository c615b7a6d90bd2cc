pub mod chart_json;
