use taskdesk_shared::Statistics;
use yew::{
  Html,
  Properties,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct StatsBarProps {
  pub stats: Option<Statistics>
}

#[function_component(StatsBar)]
pub fn stats_bar(
  props: &StatsBarProps
) -> Html {
  let Some(stats) = &props.stats else {
    return html! {};
  };

  html! {
      <div class="panel stats">
          <div class="stat">
              <div class="value">{ stats.total_tasks }</div>
              <div class="muted">{ "Total" }</div>
          </div>
          <div class="stat">
              <div class="value">{ stats.completed_tasks }</div>
              <div class="muted">{ "Completed" }</div>
          </div>
          <div class="stat">
              <div class="value">{ stats.pending_tasks }</div>
              <div class="muted">{ "Pending" }</div>
          </div>
          <div class="stat">
              <div class="value">{ format!("{:.0}%", stats.completion_percentage) }</div>
              <div class="muted">{ "Complete" }</div>
          </div>
      </div>
  }
}
