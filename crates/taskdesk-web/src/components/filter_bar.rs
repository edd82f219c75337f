use taskdesk_shared::StatusFilter;
use yew::{
  Callback,
  Html,
  Properties,
  classes,
  function_component,
  html
};

use super::input_value;

#[derive(Properties, PartialEq)]
pub struct FilterBarProps {
  pub filter:    Option<StatusFilter>,
  pub search:    String,
  pub on_filter: Callback<Option<StatusFilter>>,
  pub on_search: Callback<String>
}

#[function_component(FilterBar)]
pub fn filter_bar(
  props: &FilterBarProps
) -> Html {
  let on_search = props
    .on_search
    .reform(|e: yew::InputEvent| input_value(&e));

  let choice = |label: &'static str,
                value: Option<StatusFilter>| {
    let on_filter = props.on_filter.clone();
    let active = props.filter == value;
    html! {
        <button
            class={classes!("chip", active.then_some("active"))}
            onclick={move |_| on_filter.emit(value)}
        >
            { label }
        </button>
    }
  };

  html! {
      <div class="panel filter-bar">
          <input
              type="search"
              placeholder="Search tasks…"
              value={props.search.clone()}
              oninput={on_search}
          />
          <div class="chips">
              { choice("All", None) }
              { choice("Pending", Some(StatusFilter::Pending)) }
              { choice("Completed", Some(StatusFilter::Completed)) }
          </div>
      </div>
  }
}
