/// Verify the webhook subscription handshake (GET request).
///
/// Meta sends `hub.mode=subscribe`, `hub.verify_token=<configured token>`
/// and `hub.challenge=<random string>`; the challenge must be echoed back
/// verbatim when the token matches.
#[must_use]
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    verify_token: &str,
) -> Option<String> {
    let mode = mode?;
    let token = token?;
    let challenge = challenge?;

    if mode == "subscribe" && token == verify_token {
        Some(challenge.to_string())
    } else {
        None
    }
}
