//! Captcha solving seam.
//!
//! The API answers some calls with error 14 and a captcha image. A
//! [`CaptchaSolver`] turns that image into the text the user would type; the
//! session then repeats the call with `captcha_sid`/`captcha_key` attached.
//! Without a solver configured the captcha error reaches the caller.

/// Details of the captcha the API issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    pub sid: String,
    pub img: String,
}

impl CaptchaChallenge {
    pub fn new(sid: impl Into<String>, img: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            img: img.into(),
        }
    }
}

/// Solved captcha carried by exactly one retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaResponse {
    pub sid: String,
    pub key: String,
}

impl CaptchaResponse {
    pub fn new(sid: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            key: key.into(),
        }
    }
}

/// Shared interface implemented by captcha solvers.
///
/// Returning `None` declines the challenge.
pub trait CaptchaSolver: Send + Sync {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn solve(&self, challenge: &CaptchaChallenge) -> Option<String>;
}

impl<F> CaptchaSolver for F
where
    F: Fn(&CaptchaChallenge) -> Option<String> + Send + Sync,
{
    fn name(&self) -> &'static str {
        "closure"
    }

    fn solve(&self, challenge: &CaptchaChallenge) -> Option<String> {
        self(challenge)
    }
}

/// Default solver that never answers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineCaptcha;

impl CaptchaSolver for DeclineCaptcha {
    fn name(&self) -> &'static str {
        "decline"
    }

    fn solve(&self, challenge: &CaptchaChallenge) -> Option<String> {
        log::debug!("declining captcha {} ({})", challenge.sid, challenge.img);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_solver_declines() {
        let challenge = CaptchaChallenge::new("123", "https://api.vk.com/captcha.php?sid=123");
        assert_eq!(DeclineCaptcha.solve(&challenge), None);
    }

    #[test]
    fn closures_act_as_solvers() {
        let solver = |challenge: &CaptchaChallenge| Some(format!("key-for-{}", challenge.sid));
        let challenge = CaptchaChallenge::new("42", "https://example.com/captcha.jpg");
        assert_eq!(solver.solve(&challenge).as_deref(), Some("key-for-42"));
        assert_eq!(CaptchaSolver::name(&solver), "closure");
    }
}
