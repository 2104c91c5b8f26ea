use crate::models::{Listing, RawFieldBundle};

/// Open to an accepted region and not yet expired. Empty title or entry link
/// does not disqualify a listing.
pub fn accept(bundle: &RawFieldBundle) -> bool {
    bundle.is_eligible && !bundle.is_expired
}

/// The accepted listing for `bundle`, or `None` if it fails [`accept`].
pub fn into_listing(bundle: RawFieldBundle) -> Option<Listing> {
    if !accept(&bundle) {
        return None;
    }

    Some(Listing {
        expiration_date: bundle.expires,
        name: bundle.title,
        url: bundle.link,
        image_url: bundle.image_url,
    })
}
