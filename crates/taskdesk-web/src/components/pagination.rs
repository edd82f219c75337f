use yew::{
  Callback,
  Html,
  Properties,
  classes,
  function_component,
  html
};

#[derive(Properties, PartialEq)]
pub struct PaginationProps {
  pub page:    u32,
  pub total:   u32,
  pub on_page: Callback<u32>
}

#[function_component(Pagination)]
pub fn pagination(
  props: &PaginationProps
) -> Html {
  if props.total <= 1 {
    return html! {};
  }

  let go = |page: u32| {
    let on_page = props.on_page.clone();
    Callback::from(move |_: yew::MouseEvent| {
      on_page.emit(page)
    })
  };
  let page = props.page;

  html! {
      <nav class="pagination">
          <button class="btn" disabled={page <= 1} onclick={go(page.saturating_sub(1))}>
              { "Previous" }
          </button>
          {
              for (1..=props.total).map(|n| html! {
                  <button
                      class={classes!("btn", (n == page).then_some("active"))}
                      onclick={go(n)}
                  >
                      { n }
                  </button>
              })
          }
          <button class="btn" disabled={page >= props.total} onclick={go(page + 1)}>
              { "Next" }
          </button>
      </nav>
  }
}
