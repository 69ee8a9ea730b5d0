pub mod order;
pub mod product;
pub mod store;
pub mod user;

// Re-export only the types we actually use
pub use order::{
    CancellationReason, DeliveryAddress, Discount, Order, OrderItem, OrderRating, OrderStatus,
    PaymentDetails, TaxLine, PAYMENT_METHODS, PAYMENT_STATUSES,
};
pub use product::{Product, ProductResponse, RatingSummary, TaxInfo};
pub use store::{
    Store, StoreAddress, StoreDocument, StoreSettings, DOCUMENT_TYPES, STORE_STATUSES, STORE_TYPES,
};
pub use user::{
    BankDetails, CustomerProfile, DeliveryProfile, DeviceInfo, MerchantProfile, Permission,
    Preferences, Role, SavedAddress, User, UserProfile, USER_STATUSES, VEHICLE_TYPES,
};
