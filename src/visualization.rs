//! # Visualization
//!
//! $$
//! \{(\sigma_p^{(k)}, \mu_p^{(k)}, S^{(k)})\}_{k=1}^m \mapsto \text{risk/return scatter}
//! $$
//!
//! Efficient-frontier chart: the sampled cloud colored by Sharpe ratio with the
//! optimal portfolio on top.

use std::fs;
use std::path::Path;

use anyhow::Context;
use plotly::Layout;
use plotly::Plot;
use plotly::Scatter;
use plotly::common::ColorBar;
use plotly::common::ColorScale;
use plotly::common::ColorScalePalette;
use plotly::common::Marker;
use plotly::common::MarkerSymbol;
use plotly::common::Mode;
use plotly::common::Title;
use plotly::layout::Axis;

use crate::portfolio::frontier::SimulationResult;
use crate::portfolio::report::OptimalPortfolio;

pub const DEFAULT_TITLE: &str = "Efficient Frontier - Portfolio Optimisation";

pub struct FrontierPlot<'a> {
  simulation: &'a SimulationResult,
  optimal: Option<&'a OptimalPortfolio>,
  title: String,
  marker_size: usize,
}

impl<'a> FrontierPlot<'a> {
  pub fn new(simulation: &'a SimulationResult) -> Self {
    Self {
      simulation,
      optimal: None,
      title: DEFAULT_TITLE.to_string(),
      marker_size: 6,
    }
  }

  pub fn optimal(mut self, optimal: &'a OptimalPortfolio) -> Self {
    self.optimal = Some(optimal);
    self
  }

  pub fn title(mut self, title: &str) -> Self {
    self.title = title.into();
    self
  }

  pub fn marker_size(mut self, size: usize) -> Self {
    self.marker_size = size.max(1);
    self
  }

  pub fn plot(&self) -> Plot {
    let mut plot = Plot::new();
    plot.set_layout(
      Layout::new()
        .title(Title::from(self.title.as_str()))
        .x_axis(Axis::new().title("Annual Volatility"))
        .y_axis(Axis::new().title("Annual Return"))
        .show_legend(true),
    );

    let cloud = Scatter::new(self.simulation.volatilities(), self.simulation.returns())
      .mode(Mode::Markers)
      .name("Simulated Portfolios")
      .marker(
        Marker::new()
          .size(self.marker_size)
          .opacity(0.7)
          .color_array(self.simulation.sharpes())
          .color_scale(ColorScale::Palette(ColorScalePalette::Viridis))
          .show_scale(true)
          .color_bar(ColorBar::new().title(Title::from("Sharpe Ratio"))),
      );
    plot.add_trace(cloud);

    if let Some(opt) = self.optimal {
      let label = format!("Optimal Portfolio (Sharpe: {:.2})", opt.sharpe_ratio());
      let star = Scatter::new(
        vec![opt.performance.annual_volatility],
        vec![opt.performance.annual_return],
      )
      .mode(Mode::Markers)
      .name(label.as_str())
      .marker(
        Marker::new()
          .color("red")
          .symbol(MarkerSymbol::Star)
          .size(self.marker_size * 3),
      );
      plot.add_trace(star);
    }

    plot
  }

  /// Render to a standalone HTML file, creating parent directories.
  pub fn write_html<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
          .with_context(|| format!("failed creating plot output directory {:?}", parent))?;
      }
    }
    self.plot().write_html(path);
    Ok(())
  }
}
