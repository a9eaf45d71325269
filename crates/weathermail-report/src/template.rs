use weathermail_types::City;
use weathermail_weather::Observation;

use crate::mailer::EmailMessage;

pub fn subject_for(city: City) -> String {
    format!("Daily Weather Report for {}", city)
}

/// Builds the daily report for one subscriber: an HTML body plus a
/// plain-text fallback carrying the same readings.
pub fn render_daily_report(to: &str, city: City, observation: &Observation) -> EmailMessage {
    let conditions = escape_html(&observation.conditions);

    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  body {{ font-family: Arial, sans-serif; margin: 0; padding: 20px; background: #f5f7fa; }}
  .card {{ max-width: 600px; margin: 0 auto; background: #fff; border-radius: 12px; overflow: hidden; }}
  .header {{ background: #5b6ee1; color: #fff; padding: 24px; text-align: center; }}
  .temperature {{ font-size: 56px; font-weight: bold; color: #5b6ee1; text-align: center; margin: 24px 0 8px; }}
  .conditions {{ font-size: 22px; color: #555; text-align: center; text-transform: capitalize; }}
  .details {{ display: flex; justify-content: space-around; background: #f8f9fa; margin: 24px; padding: 16px; border-radius: 8px; }}
  .label {{ font-size: 13px; color: #666; }}
  .value {{ font-size: 20px; font-weight: bold; color: #333; }}
  .footer {{ padding: 16px; text-align: center; color: #666; font-size: 13px; }}
</style>
</head>
<body>
  <div class="card">
    <div class="header">
      <h1>Daily Weather Report</h1>
      <h2>{city}</h2>
    </div>
    <div class="temperature">{temperature}&deg;C</div>
    <div class="conditions">{conditions}</div>
    <div class="details">
      <div><div class="label">Humidity</div><div class="value">{humidity}%</div></div>
      <div><div class="label">Feels like</div><div class="value">{feels_like}&deg;C</div></div>
    </div>
    <div class="footer">
      <p>Have a wonderful day!</p>
      <p>Weather data provided by OpenWeatherMap</p>
    </div>
  </div>
</body>
</html>
"#,
        city = city,
        temperature = observation.temperature,
        conditions = conditions,
        humidity = observation.humidity,
        feels_like = observation.feels_like,
    );

    let text_body = format!(
        "Daily Weather Report for {city}\n\n\
         Temperature: {temperature}°C\n\
         Conditions: {conditions}\n\
         Humidity: {humidity}%\n\
         Feels like: {feels_like}°C\n\n\
         Have a great day!\n",
        city = city,
        temperature = observation.temperature,
        conditions = observation.conditions,
        humidity = observation.humidity,
        feels_like = observation.feels_like,
    );

    EmailMessage {
        to: to.to_string(),
        subject: subject_for(city),
        html_body,
        text_body,
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation() -> Observation {
        Observation {
            temperature: 18.3,
            humidity: 70,
            conditions: "clear sky".into(),
            feels_like: 17.9,
        }
    }

    #[test]
    fn report_carries_all_readings_in_both_bodies() {
        let msg = render_daily_report("a@example.com", City::London, &observation());

        assert_eq!(msg.to, "a@example.com");
        assert_eq!(msg.subject, "Daily Weather Report for London");
        for needle in ["London", "18.3", "clear sky", "70%", "17.9"] {
            assert!(msg.html_body.contains(needle), "html missing {needle}");
            assert!(msg.text_body.contains(needle), "text missing {needle}");
        }
    }

    #[test]
    fn conditions_are_escaped_in_html_only() {
        let mut obs = observation();
        obs.conditions = "<b>storm</b> & hail".into();
        let msg = render_daily_report("a@example.com", City::Tokyo, &obs);

        assert!(msg.html_body.contains("&lt;b&gt;storm&lt;/b&gt; &amp; hail"));
        assert!(!msg.html_body.contains("<b>storm"));
        assert!(msg.text_body.contains("<b>storm</b> & hail"));
    }

    #[test]
    fn multi_word_city_in_subject() {
        assert_eq!(subject_for(City::NewYork), "Daily Weather Report for New York");
    }
}
