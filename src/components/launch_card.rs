use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct LaunchCardProps {
    pub date: String,
    pub time: String,
    #[prop_or_default]
    pub launched: bool,
}

/// Static launch date shown instead of the ticking countdown on small screens.
#[function_component(LaunchCard)]
pub fn launch_card(props: &LaunchCardProps) -> Html {
    let heading = if props.launched { "Now available" } else { "Launching on" };

    html! {
        <div class="card launch-card text-center shadow-sm">
            <div class="card-body">
                <i class="fas fa-calendar-alt fa-2x text-primary mb-3"></i>
                <h5 class="card-title text-uppercase text-muted">{ heading }</h5>
                <p class="display-6 fw-bold mb-1">{ props.date.clone() }</p>
                {
                    if props.launched {
                        html! {}
                    } else {
                        html! { <small class="text-muted">{ props.time.clone() }</small> }
                    }
                }
            </div>
        </div>
    }
}
